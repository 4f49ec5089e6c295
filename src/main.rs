//! Kodegen Release Pipeline - release orchestration for multi-podspec SDKs.
//!
//! This binary bumps versions, maintains changelogs, bundles frameworks and
//! publishes them, printing recovery suggestions when a step fails.

use colored::Colorize;
use kodegen_release_pipeline::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  {} {}", "-".yellow(), suggestion);
            }
            if e.is_recoverable() {
                eprintln!("  Re-running the same command is safe.");
            }
            1
        }
    };

    process::exit(exit_code);
}
