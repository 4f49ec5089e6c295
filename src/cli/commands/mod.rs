//! Command execution for release tasks.

mod changelog;
mod publish;
mod repo;
mod version;

use super::{Args, Command, RuntimeConfig};
use crate::changelog::{ConsoleEntrySource, EntrySource, StaticEntries};
use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::pipeline::ReleasePipeline;
use crate::publish::{CocoaPodsCli, ReleaseStore};
use crate::tools::Tool;
use crate::vcs::SystemGit;

/// Pipeline wired to the production collaborators.
pub type CliPipeline = ReleasePipeline<SystemGit, CocoaPodsCli, ReleaseStore, Box<dyn EntrySource>>;

/// Run the parsed command, returning the process exit code.
pub async fn execute(args: &Args, runtime: &RuntimeConfig) -> Result<i32> {
    match &args.command {
        Command::Prepare { bump, notes, no_push } => {
            version::prepare(args, runtime, bump, notes, !no_push).await
        }
        Command::ApplyVersion { tag, optimistic } => {
            version::apply_version(args, runtime, tag, *optimistic).await
        }
        Command::UpdateCore { tag, notes } => version::update_core(args, runtime, tag, notes).await,
        Command::UpdateTarget { target, tag } => {
            version::update_target(args, runtime, target, tag).await
        }
        Command::ChangelogSection { repo, version } => {
            changelog::section(args, runtime, repo, version).await
        }
        Command::UpdateChangelogs { version, notes } => {
            changelog::update(args, runtime, version, notes).await
        }
        Command::Bundle {
            repo,
            version,
            no_upload,
        } => publish::bundle(args, runtime, repo, version, !no_upload).await,
        Command::Deploy { repo, version } => publish::deploy(args, runtime, repo, version).await,
        Command::Clone { repo } => repo::clone(args, runtime, repo).await,
        Command::TagAndPush { repo, version } => {
            repo::tag_and_push(args, runtime, repo, version).await
        }
    }
}

/// Fail early when a command's external tools are missing.
fn require_tools(tools: &[Tool]) -> Result<()> {
    for tool in tools {
        tool.require()?;
    }
    Ok(())
}

/// Notes from `--note`, or an interactive prompt when none were given.
fn entry_source(notes: &[String]) -> Box<dyn EntrySource> {
    if notes.is_empty() {
        Box::new(ConsoleEntrySource::stdio())
    } else {
        Box::new(StaticEntries(notes.to_vec()))
    }
}

fn build_pipeline(
    args: &Args,
    runtime: &RuntimeConfig,
    entries: Box<dyn EntrySource>,
) -> Result<CliPipeline> {
    let config_path = args.config_path();
    runtime.verbose_println(&format!("Loading {}", config_path.display()))?;

    let config = ReleaseConfig::load(&config_path, &args.root)?;
    let store = config.storage.build_store(&config.root)?;
    let registry = CocoaPodsCli::detected(&config.root);

    Ok(ReleasePipeline::new(
        config,
        args.release_env,
        SystemGit::detected(),
        registry,
        store,
        entries,
    ))
}

fn no_entries() -> Box<dyn EntrySource> {
    Box::new(StaticEntries::default())
}
