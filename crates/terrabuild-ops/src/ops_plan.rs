//! Operation: show a configured platform without building it.

use std::fmt::Write;

use terrabuild_core::platform::{PlatformPlan, RunSide};
use terrabuild_util::errors::TerraError;

use crate::context::ProjectContext;

/// Configure `platform`, resolving every catalog reference.
pub fn plan(ctx: &ProjectContext, platform: &str) -> miette::Result<PlatformPlan> {
    ctx.plan(platform)
}

/// The plan as pretty-printed JSON.
pub fn to_json(plan: &PlatformPlan) -> miette::Result<String> {
    serde_json::to_string_pretty(plan).map_err(|e| {
        TerraError::Generic {
            message: format!("cannot serialize plan for {}: {e}", plan.platform),
        }
        .into()
    })
}

/// Human-readable rendering of a plan.
pub fn render(plan: &PlatformPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} v{} ({}, namespace {})",
        plan.project_name, plan.version, plan.platform, plan.namespace
    );

    let _ = writeln!(out, "\ndependencies:");
    if plan.declarations.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for decl in &plan.declarations {
        let _ = write!(out, "  {:<20} {}", decl.mode, decl.source);
        if !decl.exclusions.is_empty() {
            let excluded: Vec<String> = decl
                .exclusions
                .iter()
                .map(|e| match &e.artifact {
                    Some(artifact) => format!("{}:{artifact}", e.group),
                    None => e.group.clone(),
                })
                .collect();
            let _ = write!(out, " (excluding {})", excluded.join(", "));
        }
        out.push('\n');
    }

    let packaging = &plan.packaging;
    let _ = writeln!(out, "\npackaging:");
    let _ = writeln!(out, "  archive         {}", plan.archive_path().display());
    if let Some(widener) = &packaging.access_widener {
        let _ = writeln!(out, "  access widener  {}", widener.display());
    }
    if let Some(refmap) = &packaging.refmap {
        let _ = writeln!(out, "  refmap          {refmap}");
    }
    if let Some(mappings) = &packaging.mappings {
        let _ = writeln!(
            out,
            "  mappings        {} ({} -> {})",
            mappings.coordinate, mappings.from, mappings.to
        );
    }
    if let Some(release) = packaging.java_release {
        let _ = writeln!(out, "  java release    {release}");
    }
    for dir in &packaging.resources {
        let _ = writeln!(out, "  resources       {}", dir.display());
    }
    for glob in &packaging.exclude {
        let _ = writeln!(out, "  exclude         {glob}");
    }

    let _ = writeln!(out, "\nrun:");
    let _ = writeln!(out, "  addon dir       {}", plan.run.addon_dir.display());
    for side in [RunSide::Client, RunSide::Server] {
        if let Some(argv) = plan.run.command(side) {
            let _ = writeln!(out, "  {:<15} {}", side, argv.join(" "));
        }
    }
    out
}
