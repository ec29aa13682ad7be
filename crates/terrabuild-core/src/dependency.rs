use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a declared dependency takes part in a platform build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionMode {
    /// Needed to compile against; never bundled or exported.
    CompileOnly,
    /// External requirement at runtime, listed in the archive manifest.
    #[default]
    Runtime,
    /// Bundled into the archive together with its transitive dependencies.
    Shaded,
    /// Bundled into the archive without any of its transitive dependencies.
    TransitiveExcluded,
}

impl InclusionMode {
    /// Whether the artifact's contents are merged into the output archive.
    pub fn is_bundled(self) -> bool {
        matches!(self, Self::Shaded | Self::TransitiveExcluded)
    }

    /// Whether the artifact's POM dependencies are followed.
    pub fn follows_transitives(self) -> bool {
        matches!(self, Self::Runtime | Self::Shaded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompileOnly => "compile-only",
            Self::Runtime => "runtime",
            Self::Shaded => "shaded",
            Self::TransitiveExcluded => "transitive-excluded",
        }
    }
}

impl fmt::Display for InclusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency entry as written under `[[platform.<name>.dependencies]]`.
///
/// Exactly one of `coordinate` (which may contain catalog placeholders) and
/// `path` (a local jar, relative to the project root) must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySpec {
    #[serde(default)]
    pub coordinate: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mode: InclusionMode,
    /// Transitive dependencies to skip, as `group` or `group:artifact`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Maven coordinates: `group:artifact:version[:classifier]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

impl MavenCoordinate {
    /// Parse `"group:artifact:version"` or `"group:artifact:version:classifier"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [group, artifact, version] => Some(Self::new(group, artifact, version, None)),
            [group, artifact, version, classifier] => {
                Some(Self::new(group, artifact, version, Some(classifier)))
            }
            _ => None,
        }
    }

    pub fn new(group: &str, artifact: &str, version: &str, classifier: Option<&str>) -> Self {
        Self {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.to_string(),
            classifier: classifier.map(str::to_string),
        }
    }

    /// Identity used for nearest-wins conflict resolution:
    /// `group:artifact` or `group:artifact:classifier`.
    pub fn key(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:{}:{c}", self.group_id, self.artifact_id),
            None => format!("{}:{}", self.group_id, self.artifact_id),
        }
    }

    /// File name of the jar in Maven layout.
    pub fn jar_filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{c}.jar", self.artifact_id, self.version),
            None => format!("{}-{}.jar", self.artifact_id, self.version),
        }
    }

    /// File name of the POM in Maven layout.
    pub fn pom_filename(&self) -> String {
        format!("{}-{}.pom", self.artifact_id, self.version)
    }

    /// The same coordinate without a classifier (its POM is shared).
    pub fn without_classifier(&self) -> Self {
        Self {
            classifier: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        Ok(())
    }
}

/// A transitive dependency to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub group: String,
    #[serde(default)]
    pub artifact: Option<String>,
}

impl Exclusion {
    /// Parse `group` or `group:artifact`. `*` matches any artifact.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(2, ':');
        let group = parts.next()?.trim();
        if group.is_empty() {
            return None;
        }
        let artifact = parts
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != "*")
            .map(str::to_string);
        Some(Self {
            group: group.to_string(),
            artifact,
        })
    }

    pub fn matches(&self, group: &str, artifact: &str) -> bool {
        (self.group == "*" || self.group == group)
            && self.artifact.as_deref().map_or(true, |a| a == artifact)
    }
}

/// Where a declared dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencySource {
    Maven(MavenCoordinate),
    /// A local jar, already resolved against the project root.
    Path(PathBuf),
}

impl fmt::Display for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maven(c) => write!(f, "{c}"),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// A fully resolved dependency declaration produced by a platform build
/// description: every catalog reference has been substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDeclaration {
    pub platform: String,
    pub source: DependencySource,
    pub mode: InclusionMode,
    pub exclusions: Vec<Exclusion>,
}

impl DependencyDeclaration {
    /// The resolved version, for Maven dependencies.
    pub fn version(&self) -> Option<&str> {
        match &self.source {
            DependencySource::Maven(c) => Some(&c.version),
            DependencySource::Path(_) => None,
        }
    }

    pub fn coordinate(&self) -> Option<&MavenCoordinate> {
        match &self.source {
            DependencySource::Maven(c) => Some(c),
            DependencySource::Path(_) => None,
        }
    }
}
