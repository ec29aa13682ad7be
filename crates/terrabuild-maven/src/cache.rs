//! Project-local artifact cache mirroring Maven repository layout.

use std::fs;
use std::path::{Path, PathBuf};

use terrabuild_core::dependency::MavenCoordinate;
use terrabuild_util::errors::TerraError;

use crate::pom::{self, Pom};

/// Artifact cache, `<project>/.terrabuild/dependencies/` unless configured
/// otherwise. Entries are only ever added, each by an atomic rename.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// A cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default cache of a project: `<project_root>/.terrabuild/dependencies/`.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".terrabuild").join("dependencies"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a coordinate: `<root>/<group path>/<artifact>/<version>`.
    pub fn artifact_dir(&self, coordinate: &MavenCoordinate) -> PathBuf {
        self.root
            .join(coordinate.group_id.replace('.', "/"))
            .join(&coordinate.artifact_id)
            .join(&coordinate.version)
    }

    pub fn jar_path(&self, coordinate: &MavenCoordinate) -> PathBuf {
        self.artifact_dir(coordinate).join(coordinate.jar_filename())
    }

    pub fn pom_path(&self, coordinate: &MavenCoordinate) -> PathBuf {
        self.artifact_dir(coordinate).join(coordinate.pom_filename())
    }

    /// Path of the cached jar, if present.
    pub fn get_jar(&self, coordinate: &MavenCoordinate) -> Option<PathBuf> {
        let path = self.jar_path(coordinate);
        path.is_file().then_some(path)
    }

    /// The cached POM, parsed, if present.
    pub fn get_pom(&self, coordinate: &MavenCoordinate) -> miette::Result<Option<Pom>> {
        let path = self.pom_path(coordinate);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(TerraError::Io)?;
        pom::parse_pom(&content)
            .map(Some)
            .map_err(|e| {
                TerraError::DependencyFetch {
                    coordinate: coordinate.to_string(),
                    message: format!("cached POM {} is unreadable: {e}", path.display()),
                }
                .into()
            })
    }

    /// Store `data` as `filename` under the coordinate's directory.
    pub fn put(
        &self,
        coordinate: &MavenCoordinate,
        filename: &str,
        data: &[u8],
    ) -> miette::Result<PathBuf> {
        let path = self.artifact_dir(coordinate).join(filename);
        terrabuild_util::fs::write_atomic(&path, data).map_err(TerraError::Io)?;
        tracing::debug!("cached {}", path.display());
        Ok(path)
    }

    pub fn put_jar(&self, coordinate: &MavenCoordinate, data: &[u8]) -> miette::Result<PathBuf> {
        self.put(coordinate, &coordinate.jar_filename(), data)
    }

    pub fn put_pom(&self, coordinate: &MavenCoordinate, xml: &str) -> miette::Result<PathBuf> {
        self.put(coordinate, &coordinate.pom_filename(), xml.as_bytes())
    }

    /// Total size of the cache directory in bytes.
    pub fn size(&self) -> u64 {
        dir_size(&self.root)
    }
}

fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            Some(if meta.is_dir() {
                dir_size(&entry.path())
            } else {
                meta.len()
            })
        })
        .sum()
}
