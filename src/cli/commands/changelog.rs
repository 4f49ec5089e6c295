//! Changelog commands.

use super::{build_pipeline, entry_source, no_entries};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

pub(super) async fn section(
    args: &Args,
    runtime: &RuntimeConfig,
    repo: &str,
    version: &str,
) -> Result<i32> {
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    let notes = pipeline.changelog_section(repo, version).await?;
    runtime.println(&notes)?;
    Ok(0)
}

pub(super) async fn update(
    args: &Args,
    runtime: &RuntimeConfig,
    version: &str,
    notes: &[String],
) -> Result<i32> {
    let mut pipeline = build_pipeline(args, runtime, entry_source(notes))?;
    let updated = pipeline.update_changelogs(version).await?;

    if updated.is_empty() {
        runtime.warn("No changelog was updated")?;
    }
    for repo in updated {
        runtime.success(&format!("Added {version} to {repo} changelog"))?;
    }
    Ok(0)
}
