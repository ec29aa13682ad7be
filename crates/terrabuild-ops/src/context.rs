//! Everything an operation needs about the project, loaded once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use terrabuild_core::catalog::Catalog;
use terrabuild_core::config::GlobalConfig;
use terrabuild_core::manifest::{Manifest, MANIFEST_FILE};
use terrabuild_core::platform::PlatformPlan;
use terrabuild_maven::cache::LocalCache;
use terrabuild_maven::fetch::MavenFetcher;
use terrabuild_maven::repository::MavenRepository;
use terrabuild_util::errors::TerraError;

/// A loaded project: manifest, catalog and global configuration.
///
/// The manifest and catalog are immutable and shared between platform
/// workers through `Arc`.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub manifest: Arc<Manifest>,
    pub catalog: Arc<Catalog>,
    pub config: GlobalConfig,
}

impl ProjectContext {
    /// Find the project containing `start_dir` and load it with the global
    /// configuration. `catalog` overrides the manifest's catalog file.
    pub fn load(start_dir: &Path, catalog: Option<&Path>) -> miette::Result<Self> {
        Self::load_with_config(start_dir, catalog, GlobalConfig::load()?)
    }

    pub fn load_with_config(
        start_dir: &Path,
        catalog: Option<&Path>,
        config: GlobalConfig,
    ) -> miette::Result<Self> {
        let root = find_project_root(start_dir)?;
        let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
        let catalog_path = match catalog {
            Some(path) => path.to_path_buf(),
            None => manifest.catalog_path(&root),
        };
        let catalog = Catalog::from_path(&catalog_path)?;
        tracing::debug!(
            "loaded {} ({} catalog entries from {})",
            root.display(),
            catalog.len(),
            catalog_path.display()
        );
        Ok(Self {
            root,
            manifest: Arc::new(manifest),
            catalog: Arc::new(catalog),
            config,
        })
    }

    /// Project repositories first, then global ones. Maven Central when
    /// neither configures any.
    pub fn repositories(&self) -> Vec<MavenRepository> {
        let mut repos: Vec<MavenRepository> = self
            .manifest
            .repositories
            .iter()
            .map(|(name, entry)| MavenRepository::from_entry(name, entry, &self.root))
            .collect();
        for (name, url) in &self.config.repositories {
            if repos.iter().any(|r| &r.name == name) {
                continue;
            }
            repos.push(MavenRepository::from_url(name, url, &self.root));
        }
        if repos.is_empty() {
            repos.push(MavenRepository::maven_central());
        }
        repos
    }

    /// A fetcher over this project's cache and repositories.
    pub fn fetcher(&self, offline: bool) -> miette::Result<MavenFetcher> {
        let cache = LocalCache::new(self.config.cache_root(&self.root));
        MavenFetcher::new(
            cache,
            self.repositories(),
            offline || self.config.build.offline,
        )
    }

    /// The platforms named in `requested`, or every configured platform
    /// when it is empty. Unknown names are an error.
    pub fn select_platforms(&self, requested: &[String]) -> miette::Result<Vec<String>> {
        if requested.is_empty() {
            return Ok(self.manifest.platform_names().map(str::to_string).collect());
        }
        let mut selected = Vec::with_capacity(requested.len());
        for name in requested {
            self.manifest.platform(name)?;
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        Ok(selected)
    }

    pub fn plan(&self, platform: &str) -> miette::Result<PlatformPlan> {
        PlatformPlan::configure(&self.manifest, &self.catalog, platform, &self.root)
    }
}

/// The nearest directory at or above `start_dir` holding a manifest.
pub fn find_project_root(start_dir: &Path) -> miette::Result<PathBuf> {
    terrabuild_util::fs::find_ancestor_with(start_dir, MANIFEST_FILE).ok_or_else(|| {
        TerraError::Manifest {
            message: format!(
                "could not find {MANIFEST_FILE} in {} or any parent directory",
                start_dir.display()
            ),
        }
        .into()
    })
}
