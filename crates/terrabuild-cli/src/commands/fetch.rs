//! Handler for `terrabuild fetch`.

use std::path::Path;

use miette::Result;
use terrabuild_ops::ops_fetch;
use terrabuild_util::progress::status_warn;

pub async fn exec(platforms: &[String], offline: bool, catalog: Option<&Path>) -> Result<()> {
    let ctx = super::load_project(catalog)?;
    for fetched in ops_fetch::fetch(&ctx, platforms, offline).await? {
        if fetched.conflicts > 0 {
            status_warn(
                "Conflicts",
                &format!(
                    "{} version conflicts in {} (run with -v for details)",
                    fetched.conflicts, fetched.platform
                ),
            );
        }
    }
    Ok(())
}
