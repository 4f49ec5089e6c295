//! Manifest publication to the package registries.
//!
//! Public targets go through an existence check followed by a bounded
//! push/backoff loop:
//!
//! ```text
//! CheckExists -> AlreadyPublished
//!             -> Push -> Succeeded
//!                     -> WaitBackoff -> Push ...
//!                     -> Exhausted (PublishFailed)
//! ```
//!
//! Private targets are pushed straight to their spec repository.

use super::retry::{AttemptOutcome, PublishAttempt, RetryPolicy};
use crate::config::{RegistryKind, ReleaseTarget};
use crate::error::{ReleaseError, Result};
use crate::version::read_version;
use semver::Version;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// Registry client errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry command exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured stderr
        stderr: String,
    },

    /// Registry command could not be started
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },
}

/// Flags for a public registry push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushFlags {
    pub allow_warnings: bool,
    pub synchronous: bool,
}

/// Package registry operations.
pub trait RegistryClient {
    /// Whether `name` is published at exactly `version`.
    fn exists(
        &self,
        name: &str,
        version: &Version,
    ) -> impl Future<Output = std::result::Result<bool, RegistryError>> + Send;

    /// Push a manifest to the public registry.
    fn push(
        &self,
        manifest: &Path,
        flags: PushFlags,
    ) -> impl Future<Output = std::result::Result<(), RegistryError>> + Send;

    /// Push a manifest to a named private spec repository.
    fn push_to_repo(
        &self,
        repo: &str,
        manifest: &Path,
    ) -> impl Future<Output = std::result::Result<(), RegistryError>> + Send;

    /// Refresh the local copy of the registry index.
    fn refresh_index(&self) -> impl Future<Output = std::result::Result<(), RegistryError>> + Send;
}

/// How a target ended up published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOutcome {
    AlreadyPublished,
    Published,
}

/// Result of publishing one target.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub target: String,
    pub version: Version,
    pub outcome: RegistryOutcome,
    pub attempts: Vec<PublishAttempt>,
}

enum PublishState {
    CheckExists,
    Push { attempt: u32 },
    WaitBackoff { attempt: u32 },
}

/// Publishes release targets through a [`RegistryClient`].
#[derive(Debug, Clone)]
pub struct RegistryPublisher<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C: RegistryClient> RegistryPublisher<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Publish `target`, whose manifest lives at `manifest`.
    ///
    /// The version is read from the manifest itself.
    pub async fn publish(&self, target: &ReleaseTarget, manifest: &Path) -> Result<PublishReport> {
        let name = target.name();
        let version = read_version(manifest).await?;

        match target.registry {
            RegistryKind::Private => self.publish_private(target, &name, version, manifest).await,
            RegistryKind::Public => self.publish_public(target, name, version, manifest).await,
        }
    }

    async fn publish_private(
        &self,
        target: &ReleaseTarget,
        name: &str,
        version: Version,
        manifest: &Path,
    ) -> Result<PublishReport> {
        let repo = target
            .pod_repo
            .as_deref()
            .ok_or_else(|| ReleaseError::Config {
                path: manifest.to_path_buf(),
                reason: format!("private target {name} has no pod_repo"),
            })?;

        log::info!("Pushing {} {} to {}", name, version, repo);
        self.client.push_to_repo(repo, manifest).await?;

        Ok(PublishReport {
            target: name.to_string(),
            attempts: vec![PublishAttempt {
                target: name.to_string(),
                version: version.to_string(),
                attempt_number: 1,
                outcome: AttemptOutcome::Succeeded,
            }],
            version,
            outcome: RegistryOutcome::Published,
        })
    }

    async fn publish_public(
        &self,
        target: &ReleaseTarget,
        name: String,
        version: Version,
        manifest: &Path,
    ) -> Result<PublishReport> {
        let flags = PushFlags {
            allow_warnings: true,
            synchronous: target.synchronize,
        };
        let mut attempts: Vec<PublishAttempt> = Vec::new();
        let mut state = PublishState::CheckExists;

        loop {
            state = match state {
                PublishState::CheckExists => {
                    if self.client.exists(&name, &version).await? {
                        log::info!("{} {} already published", name, version);
                        return Ok(PublishReport {
                            target: name,
                            version,
                            outcome: RegistryOutcome::AlreadyPublished,
                            attempts,
                        });
                    }
                    PublishState::Push { attempt: 1 }
                }

                PublishState::Push { attempt } => {
                    log::info!(
                        "Pushing {} {} (attempt {}/{})",
                        name,
                        version,
                        attempt,
                        self.policy.max_attempts()
                    );
                    match self.push_once(target, manifest, flags).await {
                        Ok(()) => {
                            attempts.push(PublishAttempt {
                                target: name.clone(),
                                version: version.to_string(),
                                attempt_number: attempt,
                                outcome: AttemptOutcome::Succeeded,
                            });
                            if target.refresh_after {
                                self.client.refresh_index().await?;
                            }
                            return Ok(PublishReport {
                                target: name,
                                version,
                                outcome: RegistryOutcome::Published,
                                attempts,
                            });
                        }
                        Err(source) if !self.policy.allows_retry_after(attempt) => {
                            return Err(ReleaseError::PublishFailed {
                                target: name,
                                version: version.to_string(),
                                attempts: attempt,
                                source,
                            });
                        }
                        Err(source) => {
                            log::warn!("Push of {} {} failed: {}", name, version, source);
                            attempts.push(PublishAttempt {
                                target: name.clone(),
                                version: version.to_string(),
                                attempt_number: attempt,
                                outcome: AttemptOutcome::Failed(source.to_string()),
                            });
                            PublishState::WaitBackoff { attempt }
                        }
                    }
                }

                PublishState::WaitBackoff { attempt } => {
                    log::info!(
                        "Waiting {}s before retrying {}",
                        self.policy.interval.as_secs(),
                        name
                    );
                    tokio::time::sleep(self.policy.interval).await;
                    PublishState::Push {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }

    async fn push_once(
        &self,
        target: &ReleaseTarget,
        manifest: &Path,
        flags: PushFlags,
    ) -> std::result::Result<(), RegistryError> {
        if target.refresh_before {
            self.client.refresh_index().await?;
        }
        self.client.push(manifest, flags).await
    }
}
