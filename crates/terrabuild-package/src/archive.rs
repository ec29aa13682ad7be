//! Writing the platform archive.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use terrabuild_core::platform::PlatformPlan;
use terrabuild_util::errors::TerraError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::shade::Entry;

pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";
pub const RESOURCE_MANIFEST_ENTRY: &str = "META-INF/terrabuild/platform.json";

/// Contents of [`RESOURCE_MANIFEST_ENTRY`].
#[derive(Debug, Clone, Serialize)]
pub struct ResourceManifest {
    pub project: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub platform: String,
    /// Coordinates the runtime environment must provide.
    pub runtime_dependencies: Vec<String>,
    /// Coordinates and jars bundled into the archive.
    pub shaded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_widener: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<MappingNamespaces>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingNamespaces {
    pub from: String,
    pub to: String,
}

impl ResourceManifest {
    pub fn new(plan: &PlatformPlan, runtime_dependencies: Vec<String>, shaded: Vec<String>) -> Self {
        let packaging = &plan.packaging;
        Self {
            project: plan.project_name.clone(),
            version: plan.version.clone(),
            group: plan.group.clone(),
            description: plan.description.clone(),
            platform: plan.platform.clone(),
            runtime_dependencies,
            shaded,
            access_widener: packaging
                .access_widener
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned()),
            refmap: packaging.refmap.clone(),
            mappings: packaging.mappings.as_ref().map(|m| MappingNamespaces {
                from: m.from.clone(),
                to: m.to.clone(),
            }),
        }
    }
}

/// What [`write_archive`] produced.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub entries: usize,
}

/// The `META-INF/MANIFEST.MF` text for a plan.
pub fn jar_manifest(plan: &PlatformPlan) -> String {
    let mut text = String::new();
    push_header(&mut text, "Manifest-Version", "1.0");
    push_header(&mut text, "Implementation-Title", &plan.project_name);
    push_header(&mut text, "Implementation-Version", &plan.version);
    if let Some(group) = &plan.group {
        push_header(&mut text, "Implementation-Vendor-Id", group);
    }
    push_header(
        &mut text,
        "Created-By",
        &format!("terrabuild {}", env!("CARGO_PKG_VERSION")),
    );
    if let Some(release) = plan.packaging.java_release {
        push_header(&mut text, "Build-Jdk-Spec", &release.to_string());
    }
    text.push_str("\r\n");
    text
}

/// Append `name: value`, folded into lines of at most 72 bytes with
/// continuation lines starting with a space.
fn push_header(text: &mut String, name: &str, value: &str) {
    let header = format!("{name}: {value}");
    let mut rest = header.as_str();
    let mut limit = 72;
    while !rest.is_empty() {
        let mut end = rest.len().min(limit);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if limit < 72 {
            text.push(' ');
        }
        text.push_str(&rest[..end]);
        text.push_str("\r\n");
        rest = &rest[end..];
        limit = 71;
    }
}

/// Write the archive for `plan` from the shaded and remapped `entries`.
///
/// Project resources and the access widener are added ahead of `entries`,
/// so they win over bundled files with the same path. The archive is
/// written to a temporary file in the output directory and renamed into
/// place only once complete.
pub fn write_archive(
    plan: &PlatformPlan,
    entries: Vec<Entry>,
    resource_manifest: &ResourceManifest,
) -> miette::Result<ArchiveReport> {
    let mut files = vec![Entry::new(MANIFEST_ENTRY, jar_manifest(plan))];
    for dir in &plan.packaging.resources {
        collect_resources(dir, &mut files)?;
    }
    if let Some(widener) = &plan.packaging.access_widener {
        let data = fs::read(widener).map_err(|e| TerraError::Packaging {
            message: format!("cannot read access widener {}: {e}", widener.display()),
        })?;
        let name = widener
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(Entry::new(name, data));
    }
    files.extend(entries);
    let json = serde_json::to_vec_pretty(resource_manifest).map_err(|e| TerraError::Packaging {
        message: format!("cannot serialize resource manifest: {e}"),
    })?;
    files.push(Entry::new(RESOURCE_MANIFEST_ENTRY, json));

    let path = plan.archive_path();
    terrabuild_util::fs::ensure_dir(&plan.output_dir).map_err(TerraError::Io)?;
    let tmp = tempfile::NamedTempFile::new_in(&plan.output_dir).map_err(TerraError::Io)?;

    let failed = |e: &dyn std::fmt::Display| TerraError::Packaging {
        message: format!("cannot write {}: {e}", path.display()),
    };
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(tmp.as_file());
    let mut seen = HashSet::new();
    for entry in &files {
        if !seen.insert(entry.name.as_str()) {
            tracing::debug!("{} already in archive; skipped", entry.name);
            continue;
        }
        zip.start_file(entry.name.as_str(), options)
            .map_err(|e| failed(&e))?;
        zip.write_all(&entry.data).map_err(|e| failed(&e))?;
    }
    zip.finish().map_err(|e| failed(&e))?;
    tmp.as_file().sync_all().map_err(TerraError::Io)?;
    // temporary files are created owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))
            .map_err(TerraError::Io)?;
    }
    tmp.persist(&path).map_err(|e| failed(&e.error))?;

    tracing::info!("wrote {} ({} entries)", path.display(), seen.len());
    Ok(ArchiveReport {
        path,
        entries: seen.len(),
    })
}

/// Add every file under `dir`, named relative to it, in sorted order.
fn collect_resources(dir: &Path, files: &mut Vec<Entry>) -> miette::Result<()> {
    if !dir.is_dir() {
        tracing::warn!("resource directory {} does not exist", dir.display());
        return Ok(());
    }
    let mut stack = vec![dir.to_path_buf()];
    let mut found = Vec::new();
    while let Some(current) = stack.pop() {
        let listing = fs::read_dir(&current).map_err(TerraError::Io)?;
        for item in listing {
            let path = item.map_err(TerraError::Io)?.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found.sort();
    for path in found {
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(&path).map_err(TerraError::Io)?;
        files.push(Entry::new(name, data));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use terrabuild_core::key_path::KeyPath;
    use terrabuild_core::platform::{PackagingPlan, RunPlan};

    fn plan(root: &Path) -> PlatformPlan {
        PlatformPlan {
            platform: "bukkit".to_string(),
            namespace: KeyPath::parse("Bukkit").unwrap(),
            project_name: "terra".to_string(),
            version: "6.0.0".to_string(),
            group: None,
            description: None,
            declarations: Vec::new(),
            packaging: PackagingPlan {
                archive_name: "Terra-6.0.0.jar".to_string(),
                access_widener: None,
                refmap: None,
                mappings: None,
                java_release: Some(17),
                resources: Vec::new(),
                exclude: Vec::new(),
            },
            run: RunPlan {
                addon_dir: root.join("addons"),
                working_dir: root.to_path_buf(),
                client: Vec::new(),
                server: Vec::new(),
                env: BTreeMap::new(),
            },
            output_dir: root.join("build/bukkit/libs"),
        }
    }

    #[test]
    fn manifest_text() {
        let dir = tempfile::tempdir().unwrap();
        let text = jar_manifest(&plan(dir.path()));
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(text.contains("Implementation-Title: terra\r\n"));
        assert!(text.contains("Build-Jdk-Spec: 17\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn long_headers_are_folded() {
        let dir = tempfile::tempdir().unwrap();
        let mut plan = plan(dir.path());
        let group = "com.dfsek.terra.".repeat(8);
        plan.group = Some(group.clone());
        let text = jar_manifest(&plan);
        assert!(text.lines().all(|l| l.trim_end_matches('\r').len() <= 72));
        let unfolded = text.replace("\r\n ", "");
        assert!(unfolded.contains(&format!("Implementation-Vendor-Id: {group}\r\n")));
    }

    #[cfg(unix)]
    #[test]
    fn archive_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let plan = plan(dir.path());
        let manifest = ResourceManifest::new(&plan, Vec::new(), Vec::new());
        let report = write_archive(&plan, vec![Entry::new("a.txt", "a")], &manifest).unwrap();
        let mode = fs::metadata(&report.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn resource_manifest_omits_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ResourceManifest::new(&plan(dir.path()), vec!["g:a:1".to_string()], Vec::new());
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["platform"], "bukkit");
        assert_eq!(json["runtime_dependencies"][0], "g:a:1");
        assert!(json.get("refmap").is_none());
        assert!(json.get("group").is_none());
    }

    #[test]
    fn missing_access_widener_is_packaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut plan = plan(dir.path());
        plan.packaging.access_widener = Some(dir.path().join("missing.accesswidener"));
        let manifest = ResourceManifest::new(&plan, Vec::new(), Vec::new());
        let err = write_archive(&plan, Vec::new(), &manifest).unwrap_err();
        assert!(err.to_string().contains("missing.accesswidener"));
        assert!(!plan.archive_path().exists());
    }
}
