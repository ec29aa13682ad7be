//! POM parsing: coordinates, parent reference, properties, dependencies and
//! dependency management.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use terrabuild_util::errors::TerraError;

/// Maximum property expansion passes, bounding self-referential properties.
const MAX_INTERPOLATION_PASSES: usize = 16;

/// A parsed POM (Project Object Model) file.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
}

/// Reference to a parent POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// A dependency declared in a POM file.
#[derive(Debug, Clone, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub exclusions: Vec<PomExclusion>,
}

/// An exclusion within a dependency declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

impl PomDependency {
    /// Whether a consumer needs this dependency at runtime: scope
    /// `compile`, `runtime` or unspecified, and not optional.
    pub fn is_runtime(&self) -> bool {
        !self.optional && matches!(self.scope.as_deref(), None | Some("compile" | "runtime"))
    }

    /// Whether the version is a Maven range such as `[1.0,2.0)`.
    pub fn has_version_range(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| v.starts_with('[') || v.starts_with('('))
    }

    /// Whether this dependency's artifact is something other than a jar.
    pub fn is_non_jar(&self) -> bool {
        self.type_.as_deref().is_some_and(|t| t != "jar" && t != "bundle")
    }
}

impl Pom {
    /// Group ID, falling back to the parent's.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Version, falling back to the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Expand `${property}` references using POM properties and the
    /// built-in `project.*` variables. Unknown properties are left as-is.
    pub fn interpolate(&self, input: &str) -> String {
        let mut current = input.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            let next = self.expand_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn expand_once(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let key = &rest[start + 2..start + len];
            out.push_str(&rest[..start]);
            match self.property(key) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..=start + len]),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    fn property(&self, key: &str) -> Option<String> {
        let key = key.strip_prefix("pom.").map_or(key.to_string(), |k| format!("project.{k}"));
        match key.as_str() {
            "project.groupId" => self.effective_group_id().map(str::to_string),
            "project.artifactId" => self.artifact_id.clone(),
            "project.version" => self.effective_version().map(str::to_string),
            "project.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent.as_ref().map(|p| p.group_id.clone()),
            "project.parent.artifactId" => self.parent.as_ref().map(|p| p.artifact_id.clone()),
            "project.parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(&key).cloned(),
        }
    }

    /// Expand property references in every dependency coordinate.
    pub fn resolve_properties(&mut self) {
        let snapshot = self.clone();
        for dep in self
            .dependencies
            .iter_mut()
            .chain(self.dependency_management.iter_mut())
        {
            dep.group_id = snapshot.interpolate(&dep.group_id);
            dep.artifact_id = snapshot.interpolate(&dep.artifact_id);
            dep.version = dep.version.as_deref().map(|v| snapshot.interpolate(v));
            dep.classifier = dep.classifier.as_deref().map(|c| snapshot.interpolate(c));
        }
    }

    /// Inherit properties, coordinates, managed versions and dependencies
    /// from `parent`.
    /// Values declared in this POM take precedence.
    pub fn apply_parent(&mut self, parent: &Pom) {
        for (k, v) in &parent.properties {
            self.properties
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(str::to_string);
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(str::to_string);
        }
        for managed in &parent.dependency_management {
            let overridden = self
                .dependency_management
                .iter()
                .any(|d| d.group_id == managed.group_id && d.artifact_id == managed.artifact_id);
            if !overridden {
                self.dependency_management.push(managed.clone());
            }
        }
        for inherited in &parent.dependencies {
            let declared = self
                .dependencies
                .iter()
                .any(|d| d.group_id == inherited.group_id && d.artifact_id == inherited.artifact_id);
            if !declared {
                self.dependencies.push(inherited.clone());
            }
        }
    }

    /// Version from dependency management for `group_id:artifact_id`.
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependency_management
            .iter()
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
            .and_then(|d| d.version.as_deref())
    }
}

/// Which dependency list an element belongs to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Dependencies,
    Managed,
}

/// Parse POM XML.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut dep: Option<PomDependency> = None;
    let mut exclusion: Option<PomExclusion> = None;
    let mut parent: Option<ParentRef> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
                let p: Vec<&str> = path.iter().map(String::as_str).collect();
                match p.as_slice() {
                    ["project", "parent"] => parent = Some(ParentRef::default()),
                    ["project", "dependencies", "dependency"]
                    | ["project", "dependencyManagement", "dependencies", "dependency"] => {
                        dep = Some(PomDependency::default());
                    }
                    [.., "dependency", "exclusions", "exclusion"] if dep.is_some() => {
                        exclusion = Some(PomExclusion::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                text = e
                    .unescape()
                    .map_err(|e| TerraError::Generic {
                        message: format!("Failed to parse POM XML: {e}"),
                    })?
                    .trim()
                    .to_string();
            }
            Ok(Event::End(_)) => {
                let value = std::mem::take(&mut text);
                let p: Vec<&str> = path.iter().map(String::as_str).collect();
                match p.as_slice() {
                    ["project", "parent"] => pom.parent = parent.take(),
                    ["project", field] => match *field {
                        "groupId" => pom.group_id = Some(value),
                        "artifactId" => pom.artifact_id = Some(value),
                        "version" => pom.version = Some(value),
                        "packaging" => pom.packaging = Some(value),
                        _ => {}
                    },
                    ["project", "parent", field] => {
                        if let Some(parent) = parent.as_mut() {
                            match *field {
                                "groupId" => parent.group_id = value,
                                "artifactId" => parent.artifact_id = value,
                                "version" => parent.version = value,
                                _ => {}
                            }
                        }
                    }
                    ["project", "properties", key] => {
                        pom.properties.insert(key.to_string(), value);
                    }
                    ["project", "dependencies", "dependency", rest @ ..] => {
                        dependency_end(&mut pom, Section::Dependencies, rest, value, &mut dep, &mut exclusion);
                    }
                    ["project", "dependencyManagement", "dependencies", "dependency", rest @ ..] => {
                        dependency_end(&mut pom, Section::Managed, rest, value, &mut dep, &mut exclusion);
                    }
                    _ => {}
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TerraError::Generic {
                    message: format!(
                        "Failed to parse POM XML at position {}: {e}",
                        reader.buffer_position()
                    ),
                }
                .into());
            }
            _ => {}
        }
    }

    Ok(pom)
}

/// Handle the end of an element inside a `<dependency>`; `rest` is the path
/// below the dependency element.
fn dependency_end(
    pom: &mut Pom,
    section: Section,
    rest: &[&str],
    value: String,
    dep: &mut Option<PomDependency>,
    exclusion: &mut Option<PomExclusion>,
) {
    match rest {
        [] => {
            if let Some(done) = dep.take() {
                match section {
                    Section::Dependencies => pom.dependencies.push(done),
                    Section::Managed => pom.dependency_management.push(done),
                }
            }
        }
        ["exclusions", "exclusion"] => {
            if let (Some(d), Some(e)) = (dep.as_mut(), exclusion.take()) {
                d.exclusions.push(e);
            }
        }
        ["exclusions", "exclusion", field] => {
            if let Some(e) = exclusion.as_mut() {
                match *field {
                    "groupId" => e.group_id = value,
                    "artifactId" => e.artifact_id = Some(value),
                    _ => {}
                }
            }
        }
        [field] => {
            if let Some(d) = dep.as_mut() {
                match *field {
                    "groupId" => d.group_id = value,
                    "artifactId" => d.artifact_id = value,
                    "version" => d.version = Some(value),
                    "scope" => d.scope = Some(value),
                    "optional" => d.optional = value == "true",
                    "classifier" => d.classifier = Some(value),
                    "type" => d.type_ = Some(value),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}
