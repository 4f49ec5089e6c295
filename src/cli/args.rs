//! Command line argument parsing and validation.
//!
//! Global options select the configuration, workspace and release
//! environment; each subcommand maps to one release task.

use crate::config::{DEFAULT_CONFIG_FILE, ReleaseEnv};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Release orchestration for multi-podspec SDKs
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_release_pipeline",
    version,
    about = "Release orchestration for multi-podspec SDKs",
    long_about = "Bumps versions across podspecs and Info.plist files, maintains changelogs, \
bundles built frameworks and publishes them to object storage and CocoaPods.

Usage:
  kodegen_release_pipeline prepare --bump minor
  kodegen_release_pipeline bundle fritz-ai-ios-sdk 4.1.0
  kodegen_release_pipeline --env production deploy fritz-ai-ios-sdk 4.1.0

Publishing is idempotent: existing archives and published versions are skipped, \
so a failed run can be repeated."
)]
pub struct Args {
    /// Release configuration file, relative to the workspace root
    #[arg(
        short,
        long,
        global = true,
        env = "RELEASE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        value_name = "PATH"
    )]
    pub config: PathBuf,

    /// Workspace root holding the manifests
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Release environment, selecting the artifact bucket
    #[arg(
        long = "env",
        global = true,
        env = "RELEASE_ENV",
        value_enum,
        default_value_t = ReleaseEnv::Local
    )]
    pub release_env: ReleaseEnv,

    /// Show detailed progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print command results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Release tasks
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Bump the version from the core manifest, rewrite all manifests, plists
    /// and changelogs, then commit and tag
    Prepare {
        /// patch, minor, major or prerelease
        #[arg(long, default_value = "patch")]
        bump: String,

        /// Changelog note; repeat for several. Prompts when omitted
        #[arg(long = "note", value_name = "TEXT")]
        notes: Vec<String>,

        /// Commit and tag locally without pushing
        #[arg(long)]
        no_push: bool,
    },

    /// Set every manifest and plist to a version
    ApplyVersion {
        tag: String,

        /// Depend on the base framework and on models with `~>`
        #[arg(long)]
        optimistic: bool,
    },

    /// Set the base and umbrella manifests and core plists to a version
    UpdateCore {
        tag: String,

        /// Changelog note; repeat for several. Prompts when omitted
        #[arg(long = "note", value_name = "TEXT")]
        notes: Vec<String>,
    },

    /// Set one target's manifest and plist to a version
    UpdateTarget { target: String, tag: String },

    /// Print the changelog notes for a version
    ChangelogSection { repo: String, version: String },

    /// Add a section for a version to every changelog
    UpdateChangelogs {
        version: String,

        /// Changelog note; repeat for several. Prompts when omitted
        #[arg(long = "note", value_name = "TEXT")]
        notes: Vec<String>,
    },

    /// Zip each target's frameworks at a tag and upload the archives
    Bundle {
        repo: String,
        version: String,

        /// Build archives without uploading
        #[arg(long)]
        no_upload: bool,
    },

    /// Publish every target's manifest at a tag
    Deploy { repo: String, version: String },

    /// Clone a release repository into its framework folder
    Clone { repo: String },

    /// Tag a release repository and push branch and tags
    TagAndPush { repo: String, version: String },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Configuration file location, resolved against the workspace root.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(&self.config)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if !self.root.is_dir() {
            return Err(format!(
                "Workspace root is not a directory: {}",
                self.root.display()
            ));
        }

        let notes = match &self.command {
            Command::Prepare { notes, .. }
            | Command::UpdateCore { notes, .. }
            | Command::UpdateChangelogs { notes, .. } => notes.as_slice(),
            _ => &[],
        };
        if notes.iter().any(|note| note.trim().is_empty()) {
            return Err("Changelog notes cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print a command result, even in quiet mode
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        self.output.println(message)
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}
