//! Fetching artifacts into the local cache from the configured repositories.

use std::path::PathBuf;

use reqwest::Client;
use terrabuild_core::dependency::MavenCoordinate;
use terrabuild_util::errors::TerraError;

use crate::cache::LocalCache;
use crate::checksum;
use crate::download;
use crate::lock::CoordinateLock;
use crate::pom::{self, Pom};
use crate::repository::MavenRepository;

/// Resolves coordinates to cached files, downloading on a cache miss.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct MavenFetcher {
    cache: LocalCache,
    repositories: Vec<MavenRepository>,
    client: Client,
    offline: bool,
}

impl MavenFetcher {
    /// Repositories are searched in order.
    pub fn new(
        cache: LocalCache,
        repositories: Vec<MavenRepository>,
        offline: bool,
    ) -> miette::Result<Self> {
        Ok(Self {
            cache,
            repositories,
            client: download::build_client()?,
            offline,
        })
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn repositories(&self) -> &[MavenRepository] {
        &self.repositories
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Path of the coordinate's jar in the cache, downloading it if needed.
    pub async fn fetch_jar(&self, coordinate: &MavenCoordinate) -> miette::Result<PathBuf> {
        if let Some(path) = self.cache.get_jar(coordinate) {
            return Ok(path);
        }
        self.ensure_online(coordinate)?;

        let label = coordinate.to_string();
        let _lock = CoordinateLock::acquire(self.cache.root(), &label).await?;
        // Another worker may have stored it while we waited.
        if let Some(path) = self.cache.get_jar(coordinate) {
            return Ok(path);
        }

        let relative = MavenRepository::jar_path(coordinate);
        match self.download(coordinate, &relative, true).await? {
            Some(data) => self.cache.put_jar(coordinate, &data),
            None => Err(TerraError::DependencyFetch {
                coordinate: label,
                message: format!("not found in any repository ({})", self.searched()),
            }
            .into()),
        }
    }

    /// The coordinate's POM, from the cache or downloaded. `Ok(None)` when
    /// no repository has one.
    pub async fn fetch_pom(&self, coordinate: &MavenCoordinate) -> miette::Result<Option<Pom>> {
        let coordinate = coordinate.without_classifier();
        if let Some(pom) = self.cache.get_pom(&coordinate)? {
            return Ok(Some(pom));
        }
        if self.offline {
            return Ok(None);
        }

        let label = coordinate.to_string();
        let _lock = CoordinateLock::acquire(self.cache.root(), &format!("{label}:pom")).await?;
        if let Some(pom) = self.cache.get_pom(&coordinate)? {
            return Ok(Some(pom));
        }

        let relative = MavenRepository::pom_path(&coordinate);
        let Some(data) = self.download(&coordinate, &relative, false).await? else {
            return Ok(None);
        };
        let xml = String::from_utf8_lossy(&data).into_owned();
        let parsed = pom::parse_pom(&xml).map_err(|e| TerraError::DependencyFetch {
            coordinate: label.clone(),
            message: format!("invalid POM: {e}"),
        })?;
        self.cache.put_pom(&coordinate, &xml)?;
        Ok(Some(parsed))
    }

    /// Try each repository in turn; the first one that has the file wins.
    async fn download(
        &self,
        coordinate: &MavenCoordinate,
        relative: &str,
        show_progress: bool,
    ) -> miette::Result<Option<Vec<u8>>> {
        let label = coordinate.to_string();
        for repo in &self.repositories {
            let progress_label = show_progress.then_some(label.as_str());
            let fetched = download::fetch_file(&self.client, repo, relative, progress_label)
                .await
                .map_err(|e| TerraError::DependencyFetch {
                    coordinate: label.clone(),
                    message: format!("{} ({})", e, repo.name),
                })?;
            let Some(data) = fetched else {
                tracing::trace!("{label} not in {}", repo.name);
                continue;
            };
            checksum::verify(&self.client, repo, relative, &data, &label).await?;
            tracing::info!("Downloaded {} from {}", relative, repo.name);
            return Ok(Some(data));
        }
        Ok(None)
    }

    fn ensure_online(&self, coordinate: &MavenCoordinate) -> miette::Result<()> {
        if self.offline {
            return Err(TerraError::DependencyFetch {
                coordinate: coordinate.to_string(),
                message: "not in the local cache and offline mode is enabled".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn searched(&self) -> String {
        if self.repositories.is_empty() {
            return "no repositories configured".to_string();
        }
        let names: Vec<&str> = self.repositories.iter().map(|r| r.name.as_str()).collect();
        format!("searched: {}", names.join(", "))
    }
}
