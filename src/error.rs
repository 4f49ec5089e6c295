//! Error types for release operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

use crate::publish::registry::RegistryError;
use crate::publish::storage::StorageError;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Bump kind outside patch/minor/major/prerelease
    #[error("Invalid version kind '{kind}': version must be 'patch', 'minor', 'major' or 'prerelease'")]
    InvalidVersionKind {
        /// The rejected input
        kind: String,
    },

    /// Version literal that is not valid semver
    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        /// The rejected literal
        version: String,
        /// Parser error
        #[source]
        source: semver::Error,
    },

    /// Manifest file does not exist
    #[error("Manifest not found: {}", path.display())]
    MissingManifest {
        /// Expected manifest location
        path: PathBuf,
    },

    /// Manifest has no version declaration
    #[error("No version declaration found in {}", path.display())]
    VersionNotFound {
        /// Manifest path
        path: PathBuf,
    },

    /// Manifest declares its version more than once
    #[error("Found {count} lines declaring a version in {}. There can only be one.", path.display())]
    AmbiguousVersionDeclaration {
        /// Manifest path
        path: PathBuf,
        /// Number of matching lines
        count: usize,
    },

    /// Some manifests were rewritten before a failure
    #[error(
        "Version rewrite stopped at {} after {} manifest(s) were updated: {source}",
        failed.display(),
        completed.len()
    )]
    PartialRewrite {
        /// Manifests already rewritten to the new version
        completed: Vec<PathBuf>,
        /// Manifest whose rewrite failed
        failed: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<ReleaseError>,
    },

    /// Changelog has no `---` line to insert after
    #[error("Changelog {} has no '---' delimiter line", path.display())]
    MissingChangelogDelimiter {
        /// Changelog path
        path: PathBuf,
    },

    /// Declared bundle directory is absent
    #[error("Bundle path does not exist: {}", path.display())]
    MissingBundlePath {
        /// Missing directory
        path: PathBuf,
    },

    /// Working tree has uncommitted changes
    #[error("Branch must be clean before releasing: {}", path.display())]
    DirtyWorkingTree {
        /// Repository checked
        path: PathBuf,
    },

    /// Unknown repository or target name
    #[error("Unknown {kind} '{name}' in release configuration")]
    UnknownName {
        /// "repository" or "target"
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// Release configuration could not be used
    #[error("Configuration error in {}: {reason}", path.display())]
    Config {
        /// Configuration file
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// Registry push still failing after all retries
    #[error("Publishing {target} {version} failed after {attempts} attempt(s): {source}")]
    PublishFailed {
        /// Manifest name
        target: String,
        /// Version being published
        version: String,
        /// Number of push attempts made
        attempts: u32,
        /// Last push failure
        #[source]
        source: RegistryError,
    },

    /// Registry client errors outside the retry loop
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Version control command failed
    #[error("git {command} failed: {reason}")]
    Vcs {
        /// Git subcommand
        command: String,
        /// stderr or spawn error
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Property list errors
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    /// Archive errors
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory walk errors
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Version pattern errors
    #[error("Invalid version pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Glob pattern errors
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Background task failure
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Required external tool not on PATH
    #[error("Required tool '{tool}' not found: {reason}")]
    MissingTool {
        /// Executable name
        tool: String,
        /// Lookup failure
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::DirtyWorkingTree { .. } => vec![
                "Commit or stash local changes, then run the release again".to_string(),
            ],
            ReleaseError::PartialRewrite { completed, .. } => {
                let mut suggestions = vec![
                    "Manifests are now at mixed versions; fix the failing manifest and re-run".to_string(),
                    "Re-running reads each manifest's current version and continues".to_string(),
                ];
                suggestions.extend(
                    completed
                        .iter()
                        .map(|path| format!("Already updated: {}", path.display())),
                );
                suggestions
            }
            ReleaseError::PublishFailed { target, .. } => vec![
                format!("Check the registry status for {target}"),
                "Publishing is idempotent: re-run deploy to continue from the first unpublished target"
                    .to_string(),
            ],
            ReleaseError::Storage(_) => vec![
                "Verify storage credentials and bucket configuration".to_string(),
                "Already uploaded archives are skipped on re-run".to_string(),
            ],
            ReleaseError::InvalidVersionKind { .. }
            | ReleaseError::AmbiguousVersionDeclaration { .. }
            | ReleaseError::VersionNotFound { .. }
            | ReleaseError::MissingManifest { .. }
            | ReleaseError::Config { .. } => {
                vec!["Fix the release configuration or manifest and run again".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if re-running the same command can succeed without human changes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReleaseError::PublishFailed { .. }
                | ReleaseError::Registry(_)
                | ReleaseError::Storage(_)
        )
    }
}
