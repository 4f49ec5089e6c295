//! Colored terminal output for command progress and results.

use colored::Colorize;
use std::io::{self, Write};

/// Writes progress to stdout and warnings to stderr, honouring verbosity flags.
///
/// Colors follow `colored`'s environment handling (`NO_COLOR`, `CLICOLOR_FORCE`).
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Command result; printed even when quiet.
    pub fn println(&self, message: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{message}")
    }

    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            writeln!(io::stdout().lock(), "{}", message.dimmed())?;
        }
        Ok(())
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout().lock(), "{} {message}", "=>".blue().bold())?;
        }
        Ok(())
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout().lock(), "{}", success_line(message))?;
        }
        Ok(())
    }

    pub fn warn(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stderr().lock(), "{}", warning_line(message))?;
        }
        Ok(())
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if !self.quiet {
            let mut out = io::stdout().lock();
            writeln!(out)?;
            writeln!(out, "{}", section_lines(title))?;
        }
        Ok(())
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout().lock(), "  {message}")?;
        }
        Ok(())
    }
}

fn success_line(message: &str) -> String {
    format!("{} {message}", "✓".green().bold())
}

fn warning_line(message: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), message.yellow())
}

fn section_lines(title: &str) -> String {
    let rule = "=".repeat(title.chars().count());
    format!("{}\n{}", title.cyan().bold(), rule.as_str().cyan())
}
