//! External tool detection.
//!
//! `pod` and `git` are located on `PATH` once per process. Commands that need
//! a tool require it up front, before anything with side effects runs.

use crate::error::{CliError, Result};
use std::path::PathBuf;
use std::sync::LazyLock;

static POD: LazyLock<Option<PathBuf>> = LazyLock::new(|| locate("pod"));

static GIT: LazyLock<Option<PathBuf>> = LazyLock::new(|| locate("git"));

fn locate(tool: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", tool, e);
            None
        }
    }
}

/// External executables the release commands drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Git,
    Pod,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Git => "git",
            Tool::Pod => "pod",
        }
    }

    fn detected(&self) -> &'static Option<PathBuf> {
        match self {
            Tool::Git => &*GIT,
            Tool::Pod => &*POD,
        }
    }

    /// Detected path, or a `MissingTool` error.
    pub fn require(&self) -> Result<PathBuf> {
        require_detected(self.name(), self.detected())
    }

    /// Detected path, falling back to the bare name for `PATH` lookup at spawn time.
    pub fn command_path(&self) -> PathBuf {
        self.detected()
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.name()))
    }
}

fn require_detected(tool: &str, detected: &Option<PathBuf>) -> Result<PathBuf> {
    detected.clone().ok_or_else(|| {
        CliError::MissingTool {
            tool: tool.to_string(),
            reason: format!("'{tool}' must be installed and on PATH"),
        }
        .into()
    })
}
