//! Command line interface for the release pipeline.
//!
//! Parses arguments, builds the pipeline from the release configuration and
//! dispatches to the requested task.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let runtime = RuntimeConfig::from(&args);
    commands::execute(&args, &runtime).await
}
