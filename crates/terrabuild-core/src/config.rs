use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the terrabuild data directory.
pub const HOME_ENV: &str = "TERRABUILD_HOME";

/// Global user configuration loaded from `~/.terrabuild/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub build: BuildConfig,

    /// Extra repositories searched after the project's own.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Build settings from `[build]` in global config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Maximum number of platforms built in parallel.
    #[serde(default = "default_jobs")]
    pub jobs: u32,
    /// Never touch the network; use cached artifacts only.
    #[serde(default)]
    pub offline: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            offline: false,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

/// Dependency cache configuration from `[cache]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Shared cache directory. When unset, each project caches under
    /// `<project>/.terrabuild/dependencies`.
    #[serde(default)]
    pub dir: Option<String>,
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the global configuration from an explicit path.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            terrabuild_util::errors::TerraError::Generic {
                message: format!("Failed to read global config: {e}"),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            terrabuild_util::errors::TerraError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Root of the dependency cache for a project.
    pub fn cache_root(&self, project_root: &Path) -> PathBuf {
        match self.cache.dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => project_root.join(".terrabuild").join("dependencies"),
        }
    }
}

/// Returns the terrabuild data directory: `$TERRABUILD_HOME`, or `~/.terrabuild/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    user_home().join(".terrabuild")
}

fn user_home() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => user_home().join(rest),
        None => PathBuf::from(dir),
    }
}
