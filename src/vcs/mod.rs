//! Version control operations.
//!
//! The pipeline treats these as opaque side effects. [`SystemGit`] shells out
//! to `git -C <repo>`.

use crate::error::{ReleaseError, Result};
use crate::tools::Tool;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Version control operations used by the release pipeline.
pub trait Vcs {
    /// Whether the working tree at `repo` has uncommitted changes to tracked files.
    fn is_dirty(&self, repo: &Path) -> impl Future<Output = Result<bool>> + Send;

    /// Check out a branch or tag.
    fn checkout(&self, repo: &Path, rev: &str) -> impl Future<Output = Result<()>> + Send;

    /// Pull `branch` from origin.
    fn pull(&self, repo: &Path, branch: &str) -> impl Future<Output = Result<()>> + Send;

    /// Stage everything and commit.
    fn commit_all(&self, repo: &Path, message: &str) -> impl Future<Output = Result<()>> + Send;

    /// Create an annotated tag.
    fn tag(
        &self,
        repo: &Path,
        name: &str,
        message: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Push the current branch, setting its upstream.
    fn push_branch(&self, repo: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Push all tags.
    fn push_tags(&self, repo: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Clone `url` into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct SystemGit {
    git: PathBuf,
}

impl SystemGit {
    /// Use the `git` found on `PATH`.
    pub fn detected() -> Self {
        Self::new(Tool::Git.command_path())
    }

    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    async fn git(&self, repo: Option<&Path>, args: &[&str]) -> Result<String> {
        let command = args.first().copied().unwrap_or_default().to_string();
        let mut cmd = Command::new(&self.git);
        if let Some(repo) = repo {
            cmd.arg("-C").arg(repo);
        }
        log::debug!("git {}", args.join(" "));

        let output = cmd.args(args).output().await.map_err(|e| ReleaseError::Vcs {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ReleaseError::Vcs {
                command,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for SystemGit {
    async fn is_dirty(&self, repo: &Path) -> Result<bool> {
        // Archives are written into the checkout, so untracked files must
        // not block a re-run.
        let status = self
            .git(Some(repo), &["status", "--porcelain", "--untracked-files=no"])
            .await?;
        Ok(!status.trim().is_empty())
    }

    async fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        self.git(Some(repo), &["checkout", rev]).await.map(drop)
    }

    async fn pull(&self, repo: &Path, branch: &str) -> Result<()> {
        self.git(Some(repo), &["pull", "origin", branch]).await.map(drop)
    }

    async fn commit_all(&self, repo: &Path, message: &str) -> Result<()> {
        self.git(Some(repo), &["add", "."]).await?;
        self.git(Some(repo), &["commit", "-am", message]).await.map(drop)
    }

    async fn tag(&self, repo: &Path, name: &str, message: &str) -> Result<()> {
        self.git(Some(repo), &["tag", "-a", name, "-m", message])
            .await
            .map(drop)
    }

    async fn push_branch(&self, repo: &Path) -> Result<()> {
        let branch = self
            .git(Some(repo), &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        self.git(Some(repo), &["push", "--set-upstream", "origin", branch.trim()])
            .await
            .map(drop)
    }

    async fn push_tags(&self, repo: &Path) -> Result<()> {
        self.git(Some(repo), &["push", "origin", "--tags"]).await.map(drop)
    }

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.git(None, &["clone", url, dest.as_ref()]).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_tracked_changes_make_the_tree_dirty() {
        let Ok(path) = Tool::Git.require() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::new(path);
        let manifest = dir.path().join("Fritz.podspec");
        std::fs::write(&manifest, "s.version = '1.0.0'\n").unwrap();
        git.git(Some(dir.path()), &["init", "-q"]).await.unwrap();
        git.git(Some(dir.path()), &["add", "."]).await.unwrap();
        git.git(
            Some(dir.path()),
            &[
                "-c",
                "user.name=Release Bot",
                "-c",
                "user.email=release@example.com",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "-qm",
                "Initial",
            ],
        )
        .await
        .unwrap();

        std::fs::write(dir.path().join("Fritz.zip"), b"zip").unwrap();
        assert!(!git.is_dirty(dir.path()).await.unwrap());

        std::fs::write(&manifest, "s.version = '1.1.0'\n").unwrap();
        assert!(git.is_dirty(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let Ok(path) = Tool::Git.require() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let err = SystemGit::new(path)
            .checkout(dir.path(), "1.0.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Vcs { ref command, .. } if command == "checkout"));
    }
}
