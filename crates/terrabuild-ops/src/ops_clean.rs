//! Operation: remove build outputs.

use std::path::Path;

use terrabuild_util::errors::TerraError;

/// Remove `build/<platform>` when a platform is given, otherwise all of
/// `build/`. The dependency cache is never touched.
pub fn clean(project_dir: &Path, platform: Option<&str>) -> miette::Result<CleanResult> {
    let build_dir = project_dir.join("build");

    if let Some(name) = platform {
        let platform_dir = build_dir.join(name);
        if platform_dir.exists() {
            std::fs::remove_dir_all(&platform_dir).map_err(TerraError::Io)?;
            tracing::debug!("removed {}", platform_dir.display());
            Ok(CleanResult::PlatformCleaned(name.to_string()))
        } else {
            Ok(CleanResult::PlatformNotFound(name.to_string()))
        }
    } else if build_dir.exists() {
        std::fs::remove_dir_all(&build_dir).map_err(TerraError::Io)?;
        tracing::debug!("removed {}", build_dir.display());
        Ok(CleanResult::AllCleaned)
    } else {
        Ok(CleanResult::NothingToClean)
    }
}

/// Result of a clean operation.
#[derive(Debug, PartialEq, Eq)]
pub enum CleanResult {
    AllCleaned,
    PlatformCleaned(String),
    PlatformNotFound(String),
    NothingToClean,
}
