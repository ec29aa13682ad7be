//! CLI argument definitions for terrabuild.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use terrabuild_core::platform::RunSide;

#[derive(Parser, Debug)]
#[command(
    name = "terrabuild",
    version,
    about = "Build driver for multi-platform Minecraft mods",
    long_about = "terrabuild resolves a shared version catalog into per-platform dependency \
                  sets, fetches them from Maven repositories and packages one archive per \
                  mod loader."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build platform archives
    Build {
        /// Platforms to build (default: all)
        platforms: Vec<String>,
        /// Build every configured platform
        #[arg(long, conflicts_with = "platforms")]
        all: bool,
        /// Use only cached dependencies
        #[arg(long)]
        offline: bool,
        /// Version catalog to use instead of the project's
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
        /// Maximum number of platforms built at once
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Download dependencies without building
    Fetch {
        /// Platforms to fetch for (default: all)
        platforms: Vec<String>,
        /// Use only cached dependencies
        #[arg(long)]
        offline: bool,
        /// Version catalog to use instead of the project's
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
    },

    /// Show a platform's resolved dependencies and packaging plan
    Plan {
        platform: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
        /// Version catalog to use instead of the project's
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
    },

    /// Run a platform's client or server hook
    Run {
        platform: String,
        side: Side,
        /// Version catalog to use instead of the project's
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
    },

    /// Query the version catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
        /// Catalog file (default: the project's)
        #[arg(long, value_name = "PATH", global = true)]
        catalog: Option<PathBuf>,
    },

    /// Remove build outputs
    Clean {
        /// Only clean this platform
        platform: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Print the resolved value at a key path
    Get {
        /// Dotted key path, e.g. Fabric.yarn
        path: String,
    },
    /// List resolved values
    List {
        /// Only list values inside this namespace
        namespace: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Side {
    Client,
    Server,
}

impl From<Side> for RunSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Client => RunSide::Client,
            Side::Server => RunSide::Server,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
