//! Release orchestration for multi-podspec SDKs
//!
//! This library automates the release of a family of CocoaPods frameworks:
//! - Version bumps rewritten consistently across every podspec and `Info.plist`
//! - Changelog sections extracted and inserted
//! - Built frameworks bundled into reproducible zip archives and uploaded once
//! - Podspecs published with existence checks and bounded retry
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod tools;
pub mod vcs;
pub mod version;

// Re-export commonly used types
pub use config::{ReleaseConfig, ReleaseEnv, ReleaseTarget};
pub use error::{CliError, ReleaseError, Result};
pub use pipeline::ReleasePipeline;
