//! Version bump and rewrite commands.

use super::{build_pipeline, entry_source, no_entries, require_tools};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::tools::Tool;
use crate::version::{BumpKind, RewriteReport};

pub(super) async fn prepare(
    args: &Args,
    runtime: &RuntimeConfig,
    bump: &str,
    notes: &[String],
    push: bool,
) -> Result<i32> {
    let kind: BumpKind = bump.parse()?;
    require_tools(&[Tool::Git])?;

    let mut pipeline = build_pipeline(args, runtime, entry_source(notes))?;
    runtime.section(&format!("Preparing {kind} release"))?;

    let version = pipeline.prepare(kind, push).await?;
    runtime.success(&format!("Bumped to version {version}"))?;
    if !push {
        runtime.warn("Commit and tag were created locally and not pushed")?;
    }
    Ok(0)
}

pub(super) async fn apply_version(
    args: &Args,
    runtime: &RuntimeConfig,
    tag: &str,
    optimistic: bool,
) -> Result<i32> {
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    runtime.section(&format!("Applying version {tag}"))?;

    let reports = pipeline.apply_version(tag, optimistic).await?;
    print_reports(runtime, &reports)?;
    runtime.success(&format!("Applied {tag} to {} manifest(s)", reports.len()))?;
    Ok(0)
}

pub(super) async fn update_core(
    args: &Args,
    runtime: &RuntimeConfig,
    tag: &str,
    notes: &[String],
) -> Result<i32> {
    let mut pipeline = build_pipeline(args, runtime, entry_source(notes))?;
    runtime.section(&format!("Updating core to {tag}"))?;

    let reports = pipeline.update_core(tag).await?;
    print_reports(runtime, &reports)?;
    runtime.success(&format!("Core manifests at {tag}"))?;
    Ok(0)
}

pub(super) async fn update_target(
    args: &Args,
    runtime: &RuntimeConfig,
    target: &str,
    tag: &str,
) -> Result<i32> {
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    let reports = pipeline.update_target(target, tag).await?;
    print_reports(runtime, &reports)?;
    runtime.success(&format!("{target} at {tag}"))?;
    Ok(0)
}

fn print_reports(runtime: &RuntimeConfig, reports: &[RewriteReport]) -> std::io::Result<()> {
    for report in reports {
        runtime.indent(&format!(
            "{} ({} line(s) changed)",
            report.path.display(),
            report.lines_changed
        ))?;
    }
    Ok(())
}
