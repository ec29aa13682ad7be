//! Command dispatch and handler modules.

mod build;
mod catalog;
mod clean;
mod fetch;
mod plan;
mod run;

use std::path::{Path, PathBuf};

use miette::Result;
use terrabuild_ops::context::ProjectContext;
use terrabuild_util::errors::TerraError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            platforms,
            all,
            offline,
            catalog,
            jobs,
        } => {
            let platforms = if all { Vec::new() } else { platforms };
            build::exec(platforms, offline, catalog.as_deref(), jobs).await
        }
        Command::Fetch {
            platforms,
            offline,
            catalog,
        } => fetch::exec(&platforms, offline, catalog.as_deref()).await,
        Command::Plan {
            platform,
            json,
            catalog,
        } => plan::exec(&platform, json, catalog.as_deref()),
        Command::Run {
            platform,
            side,
            catalog,
        } => run::exec(&platform, side.into(), catalog.as_deref()),
        Command::Catalog { action, catalog } => catalog::exec(action, catalog.as_deref()),
        Command::Clean { platform } => clean::exec(platform.as_deref()),
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir().map_err(TerraError::Io)?)
}

/// Load the project around the working directory.
fn load_project(catalog: Option<&Path>) -> Result<ProjectContext> {
    ProjectContext::load(&current_dir()?, catalog)
}
