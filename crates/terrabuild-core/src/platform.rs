//! Per-platform build descriptions.
//!
//! A `[platform.<name>]` section in `Terrabuild.toml` declares what a mod
//! loader target needs. [`PlatformPlan::configure`] turns that declaration
//! into concrete values by substituting every catalog reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use terrabuild_util::errors::TerraError;

use crate::catalog::Catalog;
use crate::dependency::{
    DependencyDeclaration, DependencySource, DependencySpec, Exclusion, MavenCoordinate,
};
use crate::key_path::KeyPath;
use crate::manifest::Manifest;
use crate::template::{self, TemplateContext, DEFAULT_ARCHIVE_NAME};

/// Raw `[platform.<name>]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Catalog namespace for relative references. Defaults to the
    /// capitalized platform name.
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    #[serde(default)]
    pub packaging: PackagingConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// `[platform.<name>.packaging]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackagingConfig {
    #[serde(default)]
    pub archive_name: Option<String>,
    #[serde(default)]
    pub access_widener: Option<String>,
    #[serde(default)]
    pub refmap: Option<String>,
    /// Coordinate of a Tiny mappings artifact; may reference the catalog.
    #[serde(default)]
    pub mappings: Option<String>,
    #[serde(default = "default_mappings_from")]
    pub mappings_from: String,
    #[serde(default = "default_mappings_to")]
    pub mappings_to: String,
    #[serde(default)]
    pub java_release: Option<u32>,
    #[serde(default)]
    pub resources: Vec<String>,
    /// Glob patterns of entries dropped while shading.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            archive_name: None,
            access_widener: None,
            refmap: None,
            mappings: None,
            mappings_from: default_mappings_from(),
            mappings_to: default_mappings_to(),
            java_release: None,
            resources: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

fn default_mappings_from() -> String {
    "named".to_string()
}

fn default_mappings_to() -> String {
    "intermediary".to_string()
}

/// `[platform.<name>.run]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    #[serde(default)]
    pub addon_dir: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub client: Vec<String>,
    #[serde(default)]
    pub server: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl PlatformConfig {
    /// Structural checks that don't need the catalog.
    pub fn validate(&self, name: &str) -> miette::Result<()> {
        for (index, dep) in self.dependencies.iter().enumerate() {
            let what = format!("platform `{name}` dependency #{}", index + 1);
            match (&dep.coordinate, &dep.path) {
                (Some(_), Some(_)) => {
                    return Err(TerraError::Manifest {
                        message: format!("{what} sets both `coordinate` and `path`"),
                    }
                    .into())
                }
                (None, None) => {
                    return Err(TerraError::Manifest {
                        message: format!("{what} needs either `coordinate` or `path`"),
                    }
                    .into())
                }
                (None, Some(path)) if !dep.mode.is_bundled() => {
                    return Err(TerraError::Manifest {
                        message: format!(
                            "{what}: local jar `{path}` must use mode `shaded` or `transitive-excluded`, not `{}`",
                            dep.mode
                        ),
                    }
                    .into())
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The catalog namespace relative references resolve in.
    pub fn namespace(&self, name: &str) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| template::capitalize(name))
    }
}

/// Which lifecycle hook to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSide {
    Client,
    Server,
}

impl RunSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for RunSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured platform: every catalog reference substituted and every
/// path resolved against the project root.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformPlan {
    pub platform: String,
    pub namespace: KeyPath,
    pub project_name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub declarations: Vec<DependencyDeclaration>,
    pub packaging: PackagingPlan,
    pub run: RunPlan,
    /// `build/<platform>/libs` under the project root.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackagingPlan {
    pub archive_name: String,
    pub access_widener: Option<PathBuf>,
    pub refmap: Option<String>,
    pub mappings: Option<MappingsPlan>,
    pub java_release: Option<u32>,
    pub resources: Vec<PathBuf>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingsPlan {
    pub coordinate: MavenCoordinate,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub addon_dir: PathBuf,
    pub working_dir: PathBuf,
    pub client: Vec<String>,
    pub server: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl RunPlan {
    /// The launch command for `side`, if one is configured.
    pub fn command(&self, side: RunSide) -> Option<&[String]> {
        let argv = match side {
            RunSide::Client => &self.client,
            RunSide::Server => &self.server,
        };
        if argv.is_empty() {
            None
        } else {
            Some(argv)
        }
    }
}

impl PlatformPlan {
    /// Configure `platform` from `manifest`, resolving all catalog references.
    pub fn configure(
        manifest: &Manifest,
        catalog: &Catalog,
        platform: &str,
        project_root: &Path,
    ) -> miette::Result<Self> {
        let config = manifest.platform(platform)?;
        config.validate(platform)?;

        let namespace = KeyPath::parse(&config.namespace(platform))?;

        let mut declarations = Vec::with_capacity(config.dependencies.len());
        for spec in &config.dependencies {
            declarations.push(declare(platform, spec, catalog, &namespace, project_root)?);
        }

        let project_name = manifest.project.name.clone();
        let version = manifest.project.version.clone();
        let packaging = &config.packaging;

        let mut ctx = TemplateContext::new(&project_name, &version, platform);
        if let Some(group) = &manifest.project.group {
            ctx.set("group", group.as_str());
        }
        let archive_name = template::interpolate(
            packaging
                .archive_name
                .as_deref()
                .unwrap_or(DEFAULT_ARCHIVE_NAME),
            &ctx,
        )?;
        if archive_name.is_empty() || archive_name.contains(['/', '\\']) {
            return Err(TerraError::Packaging {
                message: format!(
                    "platform `{platform}`: archive name `{archive_name}` must be a plain file name"
                ),
            }
            .into());
        }

        let mappings = match &packaging.mappings {
            Some(raw) => {
                let referenced_by = format!("platform `{platform}` mappings `{raw}`");
                let resolved = catalog.interpolate(raw, Some(&namespace), &referenced_by)?;
                Some(MappingsPlan {
                    coordinate: parse_coordinate(&resolved, &referenced_by)?,
                    from: packaging.mappings_from.clone(),
                    to: packaging.mappings_to.clone(),
                })
            }
            None => None,
        };

        let run = &config.run;
        let addon_dir = match &run.addon_dir {
            Some(dir) => project_root.join(dir),
            None => project_root
                .join("run")
                .join("config")
                .join(template::capitalize(&project_name))
                .join("addons"),
        };

        tracing::debug!(
            "Configured platform `{platform}`: {} dependencies, namespace {namespace}",
            declarations.len()
        );

        Ok(Self {
            platform: platform.to_string(),
            namespace,
            project_name,
            version,
            group: manifest.project.group.clone(),
            description: manifest.project.description.clone(),
            declarations,
            packaging: PackagingPlan {
                archive_name,
                access_widener: packaging.access_widener.as_ref().map(|p| project_root.join(p)),
                refmap: packaging.refmap.clone(),
                mappings,
                java_release: packaging.java_release,
                resources: packaging
                    .resources
                    .iter()
                    .map(|r| project_root.join(r))
                    .collect(),
                exclude: packaging.exclude.clone(),
            },
            run: RunPlan {
                addon_dir,
                working_dir: run
                    .working_dir
                    .as_ref()
                    .map(|d| project_root.join(d))
                    .unwrap_or_else(|| project_root.to_path_buf()),
                client: run.client.clone(),
                server: run.server.clone(),
                env: run.env.clone(),
            },
            output_dir: output_dir(project_root, platform),
        })
    }

    /// Final location of the platform archive.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.packaging.archive_name)
    }

    /// Declarations whose contents end up inside the archive.
    pub fn bundled(&self) -> impl Iterator<Item = &DependencyDeclaration> {
        self.declarations.iter().filter(|d| d.mode.is_bundled())
    }
}

/// `build/<platform>/libs` under `project_root`.
pub fn output_dir(project_root: &Path, platform: &str) -> PathBuf {
    project_root.join("build").join(platform).join("libs")
}

fn declare(
    platform: &str,
    spec: &DependencySpec,
    catalog: &Catalog,
    namespace: &KeyPath,
    project_root: &Path,
) -> miette::Result<DependencyDeclaration> {
    let source = match (&spec.coordinate, &spec.path) {
        (Some(raw), _) => {
            let referenced_by = format!("platform `{platform}` dependency `{raw}`");
            let resolved = catalog.interpolate(raw, Some(namespace), &referenced_by)?;
            DependencySource::Maven(parse_coordinate(&resolved, &referenced_by)?)
        }
        (None, Some(path)) => DependencySource::Path(project_root.join(path)),
        (None, None) => {
            return Err(TerraError::Manifest {
                message: format!("platform `{platform}`: dependency without a source"),
            }
            .into())
        }
    };

    let exclusions = spec
        .exclude
        .iter()
        .map(|e| {
            Exclusion::parse(e).ok_or_else(|| {
                miette::Report::from(TerraError::Manifest {
                    message: format!("platform `{platform}`: invalid exclusion `{e}`"),
                })
            })
        })
        .collect::<miette::Result<Vec<_>>>()?;

    Ok(DependencyDeclaration {
        platform: platform.to_string(),
        source,
        mode: spec.mode,
        exclusions,
    })
}

fn parse_coordinate(resolved: &str, referenced_by: &str) -> miette::Result<MavenCoordinate> {
    MavenCoordinate::parse(resolved).ok_or_else(|| {
        TerraError::Manifest {
            message: format!(
                "{referenced_by}: `{resolved}` is not a `group:artifact:version[:classifier]` coordinate"
            ),
        }
        .into()
    })
}
