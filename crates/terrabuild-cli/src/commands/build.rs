//! Handler for `terrabuild build`.

use std::path::Path;

use miette::Result;
use terrabuild_ops::ops_build::{self, BuildOptions};

pub async fn exec(
    platforms: Vec<String>,
    offline: bool,
    catalog: Option<&Path>,
    jobs: Option<usize>,
) -> Result<()> {
    let ctx = super::load_project(catalog)?;
    let built = ops_build::build(
        &ctx,
        &BuildOptions {
            platforms,
            offline,
            jobs,
        },
    )
    .await?;
    for platform in &built {
        tracing::info!(
            "{}: {} entries, {} bundled jars, {} runtime dependencies, sha256 {}",
            platform.platform,
            platform.entries,
            platform.bundled,
            platform.runtime,
            platform.sha256
        );
    }
    Ok(())
}
