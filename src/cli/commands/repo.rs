//! Release repository checkout and tagging.

use super::{build_pipeline, no_entries, require_tools};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::tools::Tool;

pub(super) async fn clone(args: &Args, runtime: &RuntimeConfig, repo: &str) -> Result<i32> {
    require_tools(&[Tool::Git])?;
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    let dest = pipeline.clone_repo(repo).await?;
    runtime.success(&format!("Cloned {repo} into {}", dest.display()))?;
    Ok(0)
}

pub(super) async fn tag_and_push(
    args: &Args,
    runtime: &RuntimeConfig,
    repo: &str,
    version: &str,
) -> Result<i32> {
    require_tools(&[Tool::Git])?;
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    pipeline.tag_and_push(repo, version).await?;
    runtime.success(&format!("Tagged {repo} {version} and pushed"))?;
    Ok(0)
}
