//! Transitive resolution: breadth-first over POMs, nearest wins.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use terrabuild_core::dependency::{
    DependencyDeclaration, DependencySource, Exclusion, InclusionMode, MavenCoordinate,
};
use terrabuild_maven::fetch::MavenFetcher;
use terrabuild_maven::pom::{Pom, PomDependency};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::conflict::{ConflictReport, VersionConflict};

const MAX_CONCURRENT_FETCHES: usize = 8;

/// Longest parent chain followed when building an effective POM.
pub const MAX_PARENT_DEPTH: usize = 8;

/// Where POMs come from. `Ok(None)` means the artifact has no POM.
pub trait PomSource: Clone + Send + Sync + 'static {
    fn pom(
        &self,
        coordinate: &MavenCoordinate,
    ) -> impl Future<Output = miette::Result<Option<Pom>>> + Send;
}

impl PomSource for MavenFetcher {
    async fn pom(&self, coordinate: &MavenCoordinate) -> miette::Result<Option<Pom>> {
        self.fetch_pom(coordinate).await
    }
}

/// Outcome of resolving one platform's declarations.
#[derive(Debug, Default, Clone)]
pub struct Resolution {
    /// Selected artifacts: direct declarations in declaration order, then
    /// transitives in breadth-first order.
    pub artifacts: Vec<ResolvedArtifact>,
    pub conflicts: ConflictReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: MavenCoordinate,
    pub mode: InclusionMode,
    /// 0 for direct declarations.
    pub depth: usize,
    pub requested_by: Option<MavenCoordinate>,
}

impl Resolution {
    pub fn get(&self, key: &str) -> Option<&ResolvedArtifact> {
        self.artifacts.iter().find(|a| a.coordinate.key() == key)
    }

    /// Artifacts packaged into the archive.
    pub fn bundled(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts.iter().filter(|a| a.mode.is_bundled())
    }

    /// Artifacts required at runtime but provided by the environment.
    pub fn runtime(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts
            .iter()
            .filter(|a| a.mode == InclusionMode::Runtime)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// A node waiting for its POM to be expanded.
struct Pending {
    index: usize,
    exclusions: Vec<Exclusion>,
}

/// Resolve Maven declarations and their transitive dependencies.
///
/// Only `runtime` and `shaded` declarations are expanded; their transitives
/// inherit the declaration's mode. Path declarations are ignored here.
pub async fn resolve<S: PomSource>(
    declarations: &[DependencyDeclaration],
    source: &S,
) -> miette::Result<Resolution> {
    let mut resolution = Resolution::default();
    let mut selected: HashMap<String, usize> = HashMap::new();
    let mut level: Vec<Pending> = Vec::new();

    for decl in declarations {
        let DependencySource::Maven(coordinate) = &decl.source else {
            continue;
        };
        let key = coordinate.key();
        if let Some(&existing) = selected.get(&key) {
            let kept = &resolution.artifacts[existing].coordinate;
            tracing::warn!("{key} is declared more than once; keeping {kept}");
            if kept.version != coordinate.version {
                resolution.conflicts.add(VersionConflict {
                    key,
                    requested: coordinate.version.clone(),
                    resolved: kept.version.clone(),
                    requested_by: None,
                    reason: "first declaration wins".to_string(),
                });
            }
            continue;
        }
        selected.insert(key, resolution.artifacts.len());
        if decl.mode.follows_transitives() {
            level.push(Pending {
                index: resolution.artifacts.len(),
                exclusions: decl.exclusions.clone(),
            });
        }
        resolution.artifacts.push(ResolvedArtifact {
            coordinate: coordinate.clone(),
            mode: decl.mode,
            depth: 0,
            requested_by: None,
        });
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut poms: HashMap<MavenCoordinate, Option<Pom>> = HashMap::new();

    while !level.is_empty() {
        let wanted: HashSet<MavenCoordinate> = level
            .iter()
            .map(|p| resolution.artifacts[p.index].coordinate.without_classifier())
            .filter(|c| !poms.contains_key(c))
            .collect();
        prefetch(source, wanted, &semaphore, &mut poms).await?;

        let mut next = Vec::new();
        for pending in level {
            let parent = resolution.artifacts[pending.index].clone();
            let Some(Some(pom)) = poms.get(&parent.coordinate.without_classifier()) else {
                tracing::warn!(
                    "No POM for {}; assuming it has no dependencies",
                    parent.coordinate
                );
                continue;
            };

            for dep in &pom.dependencies {
                if !dep.is_runtime() || dep.is_non_jar() {
                    continue;
                }
                if pending
                    .exclusions
                    .iter()
                    .any(|e| e.matches(&dep.group_id, &dep.artifact_id))
                {
                    tracing::debug!(
                        "{}:{} excluded under {}",
                        dep.group_id,
                        dep.artifact_id,
                        parent.coordinate
                    );
                    continue;
                }
                let Some(coordinate) = transitive_coordinate(dep, pom, &parent.coordinate) else {
                    continue;
                };

                let key = coordinate.key();
                let depth = parent.depth + 1;
                if let Some(&existing) = selected.get(&key) {
                    let winner = &resolution.artifacts[existing];
                    if winner.coordinate.version != coordinate.version {
                        let reason = if winner.depth == 0 {
                            "direct declaration wins".to_string()
                        } else {
                            format!("nearest wins (depth {} vs {depth})", winner.depth)
                        };
                        resolution.conflicts.add(VersionConflict {
                            key,
                            requested: coordinate.version.clone(),
                            resolved: winner.coordinate.version.clone(),
                            requested_by: Some(parent.coordinate.to_string()),
                            reason,
                        });
                    }
                    continue;
                }

                tracing::debug!("{coordinate} via {} ({})", parent.coordinate, parent.mode);
                selected.insert(key, resolution.artifacts.len());
                let mut exclusions = pending.exclusions.clone();
                exclusions.extend(dep.exclusions.iter().map(|e| Exclusion {
                    group: e.group_id.clone(),
                    artifact: e.artifact_id.clone().filter(|a| a != "*"),
                }));
                next.push(Pending {
                    index: resolution.artifacts.len(),
                    exclusions,
                });
                resolution.artifacts.push(ResolvedArtifact {
                    coordinate,
                    mode: parent.mode,
                    depth,
                    requested_by: Some(parent.coordinate.clone()),
                });
            }
        }
        level = next;
    }

    Ok(resolution)
}

/// The coordinate a POM dependency refers to, or `None` if it must be
/// skipped.
fn transitive_coordinate(
    dep: &PomDependency,
    pom: &Pom,
    parent: &MavenCoordinate,
) -> Option<MavenCoordinate> {
    if dep.has_version_range() {
        tracing::warn!(
            "Skipping {}:{} required by {parent}: version ranges are not supported ({})",
            dep.group_id,
            dep.artifact_id,
            dep.version.as_deref().unwrap_or_default()
        );
        return None;
    }
    let version = dep
        .version
        .as_deref()
        .filter(|v| !v.is_empty())
        .or_else(|| pom.managed_version(&dep.group_id, &dep.artifact_id));
    let Some(version) = version else {
        tracing::warn!(
            "Skipping {}:{} required by {parent}: no version declared or managed",
            dep.group_id,
            dep.artifact_id
        );
        return None;
    };
    if version.contains("${") {
        tracing::warn!(
            "Skipping {}:{} required by {parent}: unresolved property in version {version}",
            dep.group_id,
            dep.artifact_id
        );
        return None;
    }
    Some(MavenCoordinate::new(
        &dep.group_id,
        &dep.artifact_id,
        version,
        dep.classifier.as_deref(),
    ))
}

/// Fetch the effective POMs of one breadth-first level in parallel.
async fn prefetch<S: PomSource>(
    source: &S,
    wanted: HashSet<MavenCoordinate>,
    semaphore: &Arc<Semaphore>,
    poms: &mut HashMap<MavenCoordinate, Option<Pom>>,
) -> miette::Result<()> {
    let mut join_set = JoinSet::new();
    for coordinate in wanted {
        let source = source.clone();
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let pom = effective_pom(&source, &coordinate).await;
            (coordinate, pom)
        });
    }

    let mut first_error = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((coordinate, Ok(pom))) => {
                poms.insert(coordinate, pom);
            }
            Ok((_, Err(e))) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(miette::miette!("POM fetch task failed: {e}"));
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// The POM of `coordinate` with its parent chain applied and properties
/// expanded. A missing parent ends the chain with a warning.
pub async fn effective_pom<S: PomSource>(
    source: &S,
    coordinate: &MavenCoordinate,
) -> miette::Result<Option<Pom>> {
    let Some(pom) = source.pom(coordinate).await? else {
        return Ok(None);
    };

    let mut chain = vec![pom];
    let mut seen = HashSet::from([coordinate.without_classifier()]);
    while let Some(parent) = chain.last().and_then(|p| p.parent.clone()) {
        let parent = MavenCoordinate::new(
            &parent.group_id,
            &parent.artifact_id,
            &parent.version,
            None,
        );
        if chain.len() > MAX_PARENT_DEPTH || !seen.insert(parent.clone()) {
            tracing::warn!("Parent chain of {coordinate} stops at {parent}");
            break;
        }
        match source.pom(&parent).await? {
            Some(pom) => chain.push(pom),
            None => {
                tracing::warn!("Parent POM {parent} of {coordinate} not found");
                break;
            }
        }
    }

    let mut effective: Option<Pom> = None;
    while let Some(mut pom) = chain.pop() {
        if let Some(parent) = &effective {
            pom.apply_parent(parent);
        }
        pom.resolve_properties();
        effective = Some(pom);
    }
    Ok(effective)
}
