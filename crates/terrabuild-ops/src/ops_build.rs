//! Operation: build platform archives.
//!
//! Each platform runs the same pipeline on its own task:
//! configure -> resolve -> fetch -> shade -> remap -> archive.
//! Platforms share the catalog and manifest read-only and never wait on
//! each other. A failing platform does not stop its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use terrabuild_core::catalog::Catalog;
use terrabuild_core::dependency::DependencySource;
use terrabuild_core::manifest::Manifest;
use terrabuild_core::platform::PlatformPlan;
use terrabuild_maven::fetch::MavenFetcher;
use terrabuild_package::archive::{self, ResourceManifest};
use terrabuild_package::mappings::ClassMappings;
use terrabuild_package::remap::{self, IdentityRemapper};
use terrabuild_package::shade;
use terrabuild_resolver::resolver::{self, Resolution};
use terrabuild_util::errors::TerraError;
use terrabuild_util::progress::{status, status_error, status_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::context::ProjectContext;
use crate::ops_fetch::{fetch_artifacts, mappings_coordinate};

/// Options for a build invocation.
#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
    /// Platforms to build; empty means all.
    pub platforms: Vec<String>,
    pub offline: bool,
    /// Overrides `[build] jobs` from the global config.
    pub jobs: Option<usize>,
}

/// A successfully built platform.
#[derive(Debug, Clone)]
pub struct BuiltPlatform {
    pub platform: String,
    pub archive: PathBuf,
    pub entries: usize,
    pub bundled: usize,
    pub runtime: usize,
    /// SHA-256 of the written archive.
    pub sha256: String,
}

/// Build the selected platforms in parallel.
///
/// Returns the built platforms in selection order. If any platform fails,
/// every failure is reported and the build fails after all workers finish:
/// with that platform's own error when only one failed.
pub async fn build(ctx: &ProjectContext, opts: &BuildOptions) -> miette::Result<Vec<BuiltPlatform>> {
    let start = Instant::now();
    let platforms = ctx.select_platforms(&opts.platforms)?;
    let fetcher = ctx.fetcher(opts.offline)?;
    let jobs = opts
        .jobs
        .unwrap_or(ctx.config.build.jobs as usize)
        .max(1);
    tracing::debug!("building {} platforms with {jobs} jobs", platforms.len());

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut join_set = JoinSet::new();
    for (index, platform) in platforms.iter().cloned().enumerate() {
        let manifest = Arc::clone(&ctx.manifest);
        let catalog = Arc::clone(&ctx.catalog);
        let root = ctx.root.clone();
        let fetcher = fetcher.clone();
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire_owned().await;
            let result = build_platform(&manifest, &catalog, &root, &platform, &fetcher).await;
            (index, platform, result)
        });
    }

    let mut built: Vec<Option<BuiltPlatform>> = vec![None; platforms.len()];
    let mut failures: Vec<(String, miette::Report)> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, _, Ok(platform))) => {
                status(
                    "Packaged",
                    &format!("{} ({})", platform.archive.display(), platform.platform),
                );
                built[index] = Some(platform);
            }
            Ok((_, platform, Err(e))) => {
                status_error("Failed", &format!("{platform}: {e}"));
                failures.push((platform, e));
            }
            Err(e) => {
                return Err(miette::miette!("Background task failed: {e}"));
            }
        }
    }

    if failures.len() == 1 {
        if let Some((_, e)) = failures.pop() {
            return Err(e);
        }
    }
    if !failures.is_empty() {
        let mut names: Vec<String> = failures.into_iter().map(|(p, _)| p).collect();
        names.sort();
        return Err(TerraError::Generic {
            message: format!(
                "{} platforms failed to build: {}",
                names.len(),
                names.join(", ")
            ),
        }
        .into());
    }

    let built: Vec<BuiltPlatform> = built.into_iter().flatten().collect();
    status(
        "Finished",
        &format!(
            "{} platform(s) in {:.2}s",
            built.len(),
            start.elapsed().as_secs_f64()
        ),
    );
    Ok(built)
}

/// Run the whole pipeline for one platform.
pub async fn build_platform(
    manifest: &Manifest,
    catalog: &Catalog,
    root: &Path,
    platform: &str,
    fetcher: &MavenFetcher,
) -> miette::Result<BuiltPlatform> {
    let plan = PlatformPlan::configure(manifest, catalog, platform, root)?;
    status(
        "Building",
        &format!("{} v{} ({platform})", plan.project_name, plan.version),
    );

    let resolution = resolver::resolve(&plan.declarations, fetcher).await?;
    if !resolution.conflicts.is_empty() {
        tracing::info!("{platform}: {}", resolution.conflicts);
    }

    let coordinates: Vec<_> = resolution
        .artifacts
        .iter()
        .map(|a| a.coordinate.clone())
        .collect();
    let jars = fetch_artifacts(fetcher, &coordinates).await?;
    let mappings_jar = match mappings_coordinate(&plan) {
        Some(c) => Some(fetcher.fetch_jar(&c).await?),
        None => None,
    };

    let (bundled_jars, shaded_names) = bundled_inputs(&plan, &resolution, &jars);
    let entries = shade::shade(&bundled_jars, &plan.packaging.exclude)?;
    if entries.is_empty() && !bundled_jars.is_empty() {
        status_warn("Warning", &format!("{platform}: bundled jars contain no entries"));
    }

    let entries = match (&plan.packaging.mappings, &mappings_jar) {
        (Some(mappings), Some(jar)) => {
            let table = ClassMappings::from_file(jar, &mappings.from, &mappings.to)?;
            remap::remap_entries(entries, &table)?
        }
        _ => remap::remap_entries(entries, &IdentityRemapper)?,
    };

    let runtime: Vec<String> = resolution
        .runtime()
        .map(|a| a.coordinate.to_string())
        .collect();
    let resource_manifest = ResourceManifest::new(&plan, runtime.clone(), shaded_names);
    let report = archive::write_archive(&plan, entries, &resource_manifest)?;
    let sha256 = terrabuild_util::hash::file_sha256(&report.path).map_err(TerraError::Io)?;

    Ok(BuiltPlatform {
        platform: platform.to_string(),
        archive: report.path,
        entries: report.entries,
        bundled: bundled_jars.len(),
        runtime: runtime.len(),
        sha256,
    })
}

/// Jars to shade, in order: direct bundled declarations as declared,
/// then bundled transitives in resolution order. Also returns the names
/// recorded in the resource manifest.
fn bundled_inputs(
    plan: &PlatformPlan,
    resolution: &Resolution,
    jars: &[PathBuf],
) -> (Vec<PathBuf>, Vec<String>) {
    let mut paths = Vec::new();
    let mut names = Vec::new();
    for decl in plan.bundled() {
        match &decl.source {
            DependencySource::Path(path) => {
                paths.push(path.clone());
                names.push(
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                );
            }
            DependencySource::Maven(coordinate) => {
                // A duplicate declaration may have lost to an earlier one.
                let selected = resolution.artifacts.iter().position(|a| {
                    a.depth == 0 && a.coordinate == *coordinate && a.mode.is_bundled()
                });
                if let Some(index) = selected {
                    paths.push(jars[index].clone());
                    names.push(coordinate.to_string());
                }
            }
        }
    }
    for (index, artifact) in resolution.artifacts.iter().enumerate() {
        if artifact.depth > 0 && artifact.mode.is_bundled() {
            paths.push(jars[index].clone());
            names.push(artifact.coordinate.to_string());
        }
    }
    tracing::debug!("{}: shading {} jars", plan.platform, paths.len());
    (paths, names)
}
