//! Operation: run a platform's client or server hook.
//!
//! A hook first makes sure the addon directory exists, then launches the
//! configured command, if any, from the platform's working directory.

use std::path::PathBuf;

use terrabuild_core::platform::{PlatformPlan, RunSide};
use terrabuild_util::errors::TerraError;
use terrabuild_util::process::CommandBuilder;
use terrabuild_util::progress::{status, status_info};

use crate::context::ProjectContext;

/// What a hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No command configured; only the addon directory was prepared.
    Prepared(PathBuf),
    /// The command ran and exited successfully.
    Launched(String),
}

pub fn run(ctx: &ProjectContext, platform: &str, side: RunSide) -> miette::Result<RunOutcome> {
    let plan = ctx.plan(platform)?;
    run_plan(&plan, side)
}

pub fn run_plan(plan: &PlatformPlan, side: RunSide) -> miette::Result<RunOutcome> {
    let run = &plan.run;
    terrabuild_util::fs::ensure_dir(&run.addon_dir).map_err(TerraError::Io)?;
    tracing::debug!("addon directory {} ready", run.addon_dir.display());

    let Some(argv) = run.command(side) else {
        status_info(
            "Prepared",
            &format!(
                "{} (no {side} command configured for {})",
                run.addon_dir.display(),
                plan.platform
            ),
        );
        return Ok(RunOutcome::Prepared(run.addon_dir.clone()));
    };

    terrabuild_util::fs::ensure_dir(&run.working_dir).map_err(TerraError::Io)?;
    let (program, args) = argv.split_first().ok_or_else(|| TerraError::Generic {
        message: format!("empty {side} command for {}", plan.platform),
    })?;
    let mut cmd = CommandBuilder::new(program.as_str())
        .args(args.iter().cloned())
        .cwd(run.working_dir.clone());
    for (key, value) in &run.env {
        cmd = cmd.env(key.as_str(), value.as_str());
    }

    let line = cmd.display();
    status("Running", &format!("{side} for {}: `{line}`", plan.platform));
    let exit = cmd.status().map_err(|e| TerraError::Generic {
        message: format!("failed to launch `{line}`: {e}"),
    })?;
    if !exit.success() {
        return Err(TerraError::Generic {
            message: format!(
                "{side} for {} exited with {}",
                plan.platform,
                exit.code()
                    .map(|c| format!("code {c}"))
                    .unwrap_or_else(|| "a signal".to_string())
            ),
        }
        .into());
    }
    Ok(RunOutcome::Launched(line))
}
