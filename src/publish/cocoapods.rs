//! [`RegistryClient`] backed by the `pod` command-line tool.

use super::registry::{PushFlags, RegistryClient, RegistryError};
use crate::tools::Tool;
use semver::Version;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Runs `pod trunk` and `pod repo` commands from a working directory.
#[derive(Debug, Clone)]
pub struct CocoaPodsCli {
    pod: PathBuf,
    workdir: PathBuf,
}

impl CocoaPodsCli {
    /// Use the `pod` found on `PATH`.
    pub fn detected(workdir: impl Into<PathBuf>) -> Self {
        Self::new(Tool::Pod.command_path(), workdir)
    }

    pub fn new(pod: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            pod: pod.into(),
            workdir: workdir.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> std::result::Result<String, RegistryError> {
        let command = format!("pod {}", args.join(" "));
        log::debug!("Running {}", command);

        let output = Command::new(&self.pod)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .await
            .map_err(|source| RegistryError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RegistryError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether `pod trunk info` output lists `version` exactly.
///
/// Tokens are compared whole, so `1.0.0` does not match `1.0.0-beta.1`.
pub fn lists_version(info: &str, version: &Version) -> bool {
    let wanted = version.to_string();
    info.split_whitespace().any(|token| token == wanted)
}

fn manifest_arg(manifest: &Path) -> String {
    manifest.to_string_lossy().into_owned()
}

impl RegistryClient for CocoaPodsCli {
    async fn exists(
        &self,
        name: &str,
        version: &Version,
    ) -> std::result::Result<bool, RegistryError> {
        match self.run(&["trunk", "info", name]).await {
            Ok(info) => Ok(lists_version(&info, version)),
            // Unknown pods make trunk exit non-zero.
            Err(RegistryError::CommandFailed { stderr, .. }) => {
                log::debug!("pod trunk info {} failed, treating as unpublished: {}", name, stderr);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn push(
        &self,
        manifest: &Path,
        flags: PushFlags,
    ) -> std::result::Result<(), RegistryError> {
        let manifest = manifest_arg(manifest);
        let mut args = vec!["trunk", "push", manifest.as_str()];
        if flags.allow_warnings {
            args.push("--allow-warnings");
        }
        if flags.synchronous {
            args.push("--synchronous");
        }
        self.run(&args).await.map(drop)
    }

    async fn push_to_repo(
        &self,
        repo: &str,
        manifest: &Path,
    ) -> std::result::Result<(), RegistryError> {
        let manifest = manifest_arg(manifest);
        self.run(&["repo", "push", repo, manifest.as_str(), "--sources=master"])
            .await
            .map(drop)
    }

    async fn refresh_index(&self) -> std::result::Result<(), RegistryError> {
        self.run(&["repo", "update"]).await.map(drop)
    }
}
