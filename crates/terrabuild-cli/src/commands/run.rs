//! Handler for `terrabuild run`.

use std::path::Path;

use miette::Result;
use terrabuild_core::platform::RunSide;
use terrabuild_ops::ops_run;

pub fn exec(platform: &str, side: RunSide, catalog: Option<&Path>) -> Result<()> {
    let ctx = super::load_project(catalog)?;
    ops_run::run(&ctx, platform, side)?;
    Ok(())
}
