//! Operation: resolve and download every platform's dependencies into the
//! cache without packaging anything.

use std::path::PathBuf;
use std::sync::Arc;

use terrabuild_core::dependency::MavenCoordinate;
use terrabuild_core::platform::PlatformPlan;
use terrabuild_maven::fetch::MavenFetcher;
use terrabuild_resolver::resolver::{self, Resolution};
use terrabuild_util::progress::{spinner, status, status_info};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::context::ProjectContext;

const MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Per-platform result of `terrabuild fetch`.
#[derive(Debug, Clone)]
pub struct FetchedPlatform {
    pub platform: String,
    pub artifacts: usize,
    pub conflicts: usize,
}

/// Resolve and fetch the dependencies (and mappings) of `platforms`, or
/// of every platform when empty.
pub async fn fetch(
    ctx: &ProjectContext,
    platforms: &[String],
    offline: bool,
) -> miette::Result<Vec<FetchedPlatform>> {
    let fetcher = ctx.fetcher(offline)?;
    if fetcher.is_offline() {
        status_info("Offline", "using cached artifacts only");
    }
    let mut fetched = Vec::new();
    for platform in ctx.select_platforms(platforms)? {
        let plan = ctx.plan(&platform)?;
        let sp = spinner(&format!("Resolving {platform} dependencies..."));
        let resolution = resolver::resolve(&plan.declarations, &fetcher).await;
        sp.finish_and_clear();
        let resolution = resolution?;

        let mut coordinates = coordinates(&resolution);
        coordinates.extend(mappings_coordinate(&plan));
        fetch_artifacts(&fetcher, &coordinates).await?;

        status(
            "Fetched",
            &format!("{} artifacts for {platform}", coordinates.len()),
        );
        fetched.push(FetchedPlatform {
            platform,
            artifacts: coordinates.len(),
            conflicts: resolution.conflicts.len(),
        });
    }
    Ok(fetched)
}

fn coordinates(resolution: &Resolution) -> Vec<MavenCoordinate> {
    resolution
        .artifacts
        .iter()
        .map(|a| a.coordinate.clone())
        .collect()
}

pub(crate) fn mappings_coordinate(plan: &PlatformPlan) -> Option<MavenCoordinate> {
    plan.packaging.mappings.as_ref().map(|m| m.coordinate.clone())
}

/// Fetch every coordinate's jar in parallel. Paths are returned in the
/// order of `coordinates`; the first failure is returned after all
/// downloads finish.
pub async fn fetch_artifacts(
    fetcher: &MavenFetcher,
    coordinates: &[MavenCoordinate],
) -> miette::Result<Vec<PathBuf>> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS));
    let mut join_set = JoinSet::new();
    for (index, coordinate) in coordinates.iter().cloned().enumerate() {
        let fetcher = fetcher.clone();
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire_owned().await;
            (index, fetcher.fetch_jar(&coordinate).await)
        });
    }

    let mut paths: Vec<Option<PathBuf>> = vec![None; coordinates.len()];
    let mut first_error = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Ok(path))) => paths[index] = Some(path),
            Ok((_, Err(e))) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(miette::miette!("Background task failed: {e}"));
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(paths.into_iter().flatten().collect())
}
