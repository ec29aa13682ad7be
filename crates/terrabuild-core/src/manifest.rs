use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use terrabuild_util::errors::TerraError;

use crate::catalog::DEFAULT_CATALOG_FILE;
use crate::platform::PlatformConfig;

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "Terrabuild.toml";

/// The parsed representation of a `Terrabuild.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectMetadata,

    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,

    #[serde(default)]
    pub platform: BTreeMap<String, PlatformConfig>,
}

/// Project identity from the `[project]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog file, relative to the project root.
    #[serde(default)]
    pub catalog: Option<String>,
}

/// A repository entry, either a plain URL or a table with credentials.
///
/// `file://` URLs and plain paths denote local directory repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        auth: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

impl RepositoryEntry {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Detailed { url, .. } => url,
        }
    }
}

impl Manifest {
    /// Read and parse a `Terrabuild.toml`, applying `${env:VAR}`
    /// interpolation from the sibling `.terrabuild.env` file first.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TerraError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let env_vars = crate::properties::load_env_file(&dir.join(crate::properties::ENV_FILE))?;

        // Substitute into parsed strings so values never need TOML escaping.
        let mut document: toml::Value = toml::from_str(&content).map_err(|e| TerraError::Manifest {
            message: format!("Failed to parse {MANIFEST_FILE}: {e}"),
        })?;
        crate::properties::interpolate_value(&mut document, &env_vars);
        let manifest: Self = document.try_into().map_err(|e| TerraError::Manifest {
            message: format!("Failed to parse {MANIFEST_FILE}: {e}"),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a `Terrabuild.toml` from a string (no interpolation).
    pub fn parse(content: &str) -> miette::Result<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| TerraError::Manifest {
            message: format!("Failed to parse {MANIFEST_FILE}: {e}"),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> miette::Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(TerraError::Manifest {
                message: "`project.name` must not be empty".to_string(),
            }
            .into());
        }
        if self.project.version.trim().is_empty() {
            return Err(TerraError::Manifest {
                message: "`project.version` must not be empty".to_string(),
            }
            .into());
        }
        for (name, platform) in &self.platform {
            platform.validate(name)?;
        }
        Ok(())
    }

    /// The catalog file for this project, resolved against `project_root`.
    pub fn catalog_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(
            self.project
                .catalog
                .as_deref()
                .unwrap_or(DEFAULT_CATALOG_FILE),
        )
    }

    /// Look up a platform by name.
    pub fn platform(&self, name: &str) -> miette::Result<&PlatformConfig> {
        self.platform.get(name).ok_or_else(|| {
            let known = self.platform_names().collect::<Vec<_>>();
            TerraError::Manifest {
                message: if known.is_empty() {
                    format!("Unknown platform `{name}`: no platforms are configured")
                } else {
                    format!(
                        "Unknown platform `{name}`; configured platforms: {}",
                        known.join(", ")
                    )
                },
            }
            .into()
        })
    }

    /// Configured platform names, sorted.
    pub fn platform_names(&self) -> impl Iterator<Item = &str> {
        self.platform.keys().map(String::as_str)
    }
}
