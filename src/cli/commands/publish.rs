//! Artifact bundling and registry deployment commands.

use super::{build_pipeline, no_entries, require_tools};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::publish::{RegistryOutcome, UploadOutcome};
use crate::tools::Tool;

pub(super) async fn bundle(
    args: &Args,
    runtime: &RuntimeConfig,
    repo: &str,
    version: &str,
    upload: bool,
) -> Result<i32> {
    require_tools(&[Tool::Git])?;
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    runtime.section(&format!("Bundling {repo} {version}"))?;

    for artifact in pipeline.release_resources(repo, version, upload).await? {
        let status = match &artifact.upload {
            Some(UploadOutcome::Uploaded { sha256 }) => format!("uploaded (sha256 {sha256})"),
            Some(UploadOutcome::Skipped) => "already uploaded".to_string(),
            None => "not uploaded".to_string(),
        };
        runtime.indent(&format!(
            "{}: {} file(s), {}",
            artifact.archive.file_name(),
            artifact.archive.entries.len(),
            status
        ))?;
    }

    runtime.success(&format!("Release resources for {repo} {version} ready"))?;
    Ok(0)
}

pub(super) async fn deploy(
    args: &Args,
    runtime: &RuntimeConfig,
    repo: &str,
    version: &str,
) -> Result<i32> {
    require_tools(&[Tool::Git, Tool::Pod])?;
    let pipeline = build_pipeline(args, runtime, no_entries())?;
    runtime.section(&format!("Deploying {repo} {version}"))?;

    for report in pipeline.deploy(repo, version).await? {
        let status = match report.outcome {
            RegistryOutcome::AlreadyPublished => "already published".to_string(),
            RegistryOutcome::Published => {
                format!("published after {} attempt(s)", report.attempts.len())
            }
        };
        runtime.indent(&format!("{} {}: {}", report.target, report.version, status))?;
    }

    runtime.success(&format!("Deployed {repo} {version}"))?;
    Ok(0)
}
