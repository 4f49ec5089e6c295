//! Release orchestration.
//!
//! [`ReleasePipeline`] sequences the version, changelog, bundling and
//! publishing steps over the repositories in a [`ReleaseConfig`]. Work runs
//! strictly in order; re-running a phase relies on the existence checks in
//! the publishers rather than on any local state.

use crate::bundler::{ArtifactBundler, BundledArchive};
use crate::changelog::{self, EntrySource};
use crate::config::{ReleaseConfig, ReleaseEnv, RepoConfig};
use crate::error::{ReleaseError, Result};
use crate::publish::{
    ArtifactPublisher, ObjectStore, PublishReport, RegistryClient, RegistryPublisher,
    UploadOutcome, artifact_key,
};
use crate::vcs::Vcs;
use crate::version::plist::update_info_plist;
use crate::version::{
    BumpKind, ManifestRewriter, RewriteReport, RewriteRequest, bump, parse_version, read_version,
};
use semver::Version;
use std::path::{Path, PathBuf};

/// An archive built for one target, and what happened to its upload.
#[derive(Debug, Clone)]
pub struct ReleasedArtifact {
    pub target: String,
    pub archive: BundledArchive,
    /// `None` when uploading was not requested.
    pub upload: Option<UploadOutcome>,
}

struct ManifestPlan {
    path: PathBuf,
    optimistic_targets: Vec<String>,
    pinned_only: bool,
}

/// Release pipeline over injected version control, registry, storage and
/// changelog entry source.
pub struct ReleasePipeline<V, R, S, E> {
    config: ReleaseConfig,
    env: ReleaseEnv,
    vcs: V,
    registry: RegistryPublisher<R>,
    artifacts: ArtifactPublisher<S>,
    entries: E,
    rewriter: ManifestRewriter,
}

impl<V, R, S, E> ReleasePipeline<V, R, S, E>
where
    V: Vcs,
    R: RegistryClient,
    S: ObjectStore,
    E: EntrySource,
{
    pub fn new(
        config: ReleaseConfig,
        env: ReleaseEnv,
        vcs: V,
        registry: R,
        store: S,
        entries: E,
    ) -> Self {
        let rewriter = ManifestRewriter::new(config.excluded_dependencies.clone());
        let registry = RegistryPublisher::new(registry, config.retry);
        Self {
            config,
            env,
            vcs,
            registry,
            artifacts: ArtifactPublisher::new(store),
            entries,
            rewriter,
        }
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn registry_client(&self) -> &R {
        self.registry.client()
    }

    pub fn store(&self) -> &S {
        self.artifacts.store()
    }

    /// Bump the workspace version and cut a release commit and tag.
    ///
    /// The working tree must be clean. Every manifest matching the manifest
    /// glob is rewritten from its own current version, then property lists and
    /// changelogs follow. Returns the new version.
    pub async fn prepare(&mut self, kind: BumpKind, push: bool) -> Result<Version> {
        let root = self.config.root.clone();
        self.ensure_clean(&root).await?;

        log::info!("Updating latest {} branch", self.config.main_branch);
        self.vcs.checkout(&root, &self.config.main_branch).await?;
        self.vcs.pull(&root, &self.config.main_branch).await?;

        let current = read_version(&self.config.resolve(&self.config.core_manifest)).await?;
        let new = bump(&current, kind)?;
        log::info!("Releasing {} (was {})", new, current);

        let plans = self
            .find(&self.config.manifest_glob)?
            .into_iter()
            .map(|path| ManifestPlan {
                path,
                optimistic_targets: Vec::new(),
                pinned_only: false,
            })
            .collect();
        self.rewrite_all(plans, &new).await?;
        self.update_plists(&new).await?;
        self.update_changelogs(&new.to_string()).await?;

        self.vcs
            .commit_all(&root, &format!("Bump to version {new}"))
            .await?;
        if push {
            self.vcs.push_branch(&root).await?;
        }
        self.vcs
            .tag(&root, &new.to_string(), &format!("Cut new version {new}"))
            .await?;
        if push {
            self.vcs.push_tags(&root).await?;
        }

        Ok(new)
    }

    /// Set every manifest and property list to `tag`.
    ///
    /// With `optimistic`, model manifests depend on the optimistic dependency
    /// with `~>`, and manifests listed as dependents of a target depend on that
    /// target with `~>`.
    pub async fn apply_version(&self, tag: &str, optimistic: bool) -> Result<Vec<RewriteReport>> {
        let new = parse_version(tag)?;
        let plans = self
            .find(&self.config.manifest_glob)?
            .into_iter()
            .map(|path| {
                let optimistic_targets = if !optimistic {
                    Vec::new()
                } else if self.config.is_model_manifest(&path) {
                    vec![self.config.optimistic_dependency.clone()]
                } else {
                    self.targets_depended_on_by(&path)
                };
                ManifestPlan {
                    path,
                    optimistic_targets,
                    pinned_only: false,
                }
            })
            .collect();

        let reports = self.rewrite_all(plans, &new).await?;
        self.update_plists(&new).await?;
        Ok(reports)
    }

    /// Set the base and umbrella manifests and the core property lists to `tag`.
    ///
    /// Only pinned versions are rewritten, so optimistic model dependencies
    /// in the umbrella manifest keep their range.
    pub async fn update_core(&mut self, tag: &str) -> Result<Vec<RewriteReport>> {
        let new = parse_version(tag)?;

        let mut paths = Vec::new();
        for manifest in [&self.config.base_manifest, &self.config.umbrella_manifest] {
            paths.extend(self.find_named(manifest)?);
        }
        let plans = paths
            .into_iter()
            .map(|path| ManifestPlan {
                path,
                optimistic_targets: Vec::new(),
                pinned_only: true,
            })
            .collect();
        let reports = self.rewrite_all(plans, &new).await?;

        for target in &self.config.core_plist_targets {
            let path = self.config.resolve(&self.config.plist_path_for(target));
            self.update_plist(&path, &new).await?;
        }

        self.update_changelogs(&new.to_string()).await?;
        Ok(reports)
    }

    /// Set a single target's manifest and property list to `tag`, depending
    /// on the optimistic dependency with `~>`.
    pub async fn update_target(&self, target: &str, tag: &str) -> Result<Vec<RewriteReport>> {
        let new = parse_version(tag)?;
        let paths = self.find_named(Path::new(&format!("{target}.podspec")))?;
        if paths.is_empty() {
            return Err(ReleaseError::UnknownName {
                kind: "target",
                name: target.to_string(),
            });
        }

        let plans = paths
            .into_iter()
            .map(|path| ManifestPlan {
                path,
                optimistic_targets: vec![self.config.optimistic_dependency.clone()],
                pinned_only: false,
            })
            .collect();
        let reports = self.rewrite_all(plans, &new).await?;

        let plist = self.config.resolve(&self.config.plist_path_for(target));
        self.update_plist(&plist, &new).await?;
        Ok(reports)
    }

    /// Notes for `version` from a repository's changelog.
    pub async fn changelog_section(&self, repo: &str, version: &str) -> Result<String> {
        let repo = self.config.repo(repo)?;
        changelog::changelog_section(&self.config.resolve(&repo.changelog), version).await
    }

    /// Offer a new section for `version` in every repository changelog.
    ///
    /// Returns the repositories whose changelog was updated.
    pub async fn update_changelogs(&mut self, version: &str) -> Result<Vec<String>> {
        let mut updated = Vec::new();
        for repo in self.config.repos.values() {
            let path = self.config.root.join(&repo.changelog);
            let added = changelog::update_changelog(
                &path,
                &repo.name,
                version,
                &repo.link_base,
                &mut self.entries,
            )
            .await?;
            if added {
                updated.push(repo.name.clone());
            }
        }
        Ok(updated)
    }

    /// Bundle every target of `repo` at tag `version`, uploading the archives
    /// unless `upload` is false.
    ///
    /// The framework checkout must be clean. It is returned to its main branch
    /// afterwards, also when bundling fails.
    pub async fn release_resources(
        &self,
        repo: &str,
        version: &str,
        upload: bool,
    ) -> Result<Vec<ReleasedArtifact>> {
        let repo = self.config.repo(repo)?;
        let folder = self.config.resolve(&repo.framework_folder);
        self.ensure_clean(&folder).await?;

        self.vcs.checkout(&folder, version).await?;
        let released = self.bundle_targets(repo, &folder, upload).await;
        let restored = self.vcs.checkout(&folder, &repo.main_branch).await;

        let released = released?;
        restored?;
        Ok(released)
    }

    /// Publish every manifest of `repo` at tag `version`, in target order.
    pub async fn deploy(&self, repo: &str, version: &str) -> Result<Vec<PublishReport>> {
        let repo = self.config.repo(repo)?;
        let folder = self.config.resolve(&repo.framework_folder);

        self.registry.client().refresh_index().await?;
        self.vcs.checkout(&folder, version).await?;
        let published = self.publish_targets(repo, &folder).await;
        let restored = self.vcs.checkout(&folder, &repo.main_branch).await;

        let published = published?;
        restored?;
        Ok(published)
    }

    /// Clone `repo` into its framework folder.
    pub async fn clone_repo(&self, repo: &str) -> Result<PathBuf> {
        let repo = self.config.repo(repo)?;
        let dest = self.config.resolve(&repo.framework_folder);
        self.vcs.clone_repo(&repo.repo_url, &dest).await?;
        Ok(dest)
    }

    /// Tag the framework checkout with `version` and push branch and tags.
    pub async fn tag_and_push(&self, repo: &str, version: &str) -> Result<()> {
        let repo = self.config.repo(repo)?;
        let folder = self.config.resolve(&repo.framework_folder);
        self.vcs
            .tag(&folder, version, &format!("Bump to version {version}"))
            .await?;
        self.vcs.push_branch(&folder).await?;
        self.vcs.push_tags(&folder).await
    }

    async fn ensure_clean(&self, repo: &Path) -> Result<()> {
        if self.vcs.is_dirty(repo).await? {
            return Err(ReleaseError::DirtyWorkingTree {
                path: repo.to_path_buf(),
            });
        }
        Ok(())
    }

    async fn bundle_targets(
        &self,
        repo: &RepoConfig,
        folder: &Path,
        upload: bool,
    ) -> Result<Vec<ReleasedArtifact>> {
        let mut released = Vec::with_capacity(repo.targets.len());

        for target in &repo.targets {
            let name = target.name();
            let bundler = ArtifactBundler::new(folder);
            let (archive_name, bundled, extras) = (
                name.clone(),
                target.bundled.clone(),
                vec![repo.license_file.clone()],
            );
            let archive = tokio::task::spawn_blocking(move || {
                bundler.bundle(&archive_name, &bundled, &extras)
            })
            .await??;

            let upload = if upload {
                let bucket = self.config.storage.bucket(self.env)?;
                let version = read_version(&folder.join(&target.manifest)).await?;
                let key = artifact_key(&name, &version.to_string(), &archive.file_name());
                Some(
                    self.artifacts
                        .publish_if_absent(bucket, &key, &archive.path)
                        .await?,
                )
            } else {
                None
            };

            released.push(ReleasedArtifact {
                target: name,
                archive,
                upload,
            });
        }

        Ok(released)
    }

    async fn publish_targets(
        &self,
        repo: &RepoConfig,
        folder: &Path,
    ) -> Result<Vec<PublishReport>> {
        let mut reports = Vec::with_capacity(repo.targets.len());
        for target in &repo.targets {
            let report = self
                .registry
                .publish(target, &folder.join(&target.manifest))
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Rewrite manifests in order, each from its own declared version.
    async fn rewrite_all(
        &self,
        plans: Vec<ManifestPlan>,
        new: &Version,
    ) -> Result<Vec<RewriteReport>> {
        let mut reports: Vec<RewriteReport> = Vec::with_capacity(plans.len());

        for plan in plans {
            match self.rewrite_one(&plan, new).await {
                Ok(report) => reports.push(report),
                Err(source) if reports.is_empty() => return Err(source),
                Err(source) => {
                    return Err(ReleaseError::PartialRewrite {
                        completed: reports.into_iter().map(|r| r.path).collect(),
                        failed: plan.path,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(reports)
    }

    async fn rewrite_one(&self, plan: &ManifestPlan, new: &Version) -> Result<RewriteReport> {
        let current = read_version(&plan.path).await?;
        let request = RewriteRequest {
            current: &current,
            new,
            optimistic_targets: &plan.optimistic_targets,
            pinned_only: plan.pinned_only,
        };
        self.rewriter.rewrite(&plan.path, &request).await
    }

    async fn update_plists(&self, new: &Version) -> Result<()> {
        for path in self.find(&self.config.plist_glob)? {
            self.update_plist(&path, new).await?;
        }
        Ok(())
    }

    async fn update_plist(&self, path: &Path, new: &Version) -> Result<()> {
        update_info_plist(path, &self.config.plist_version_key, &new.to_string()).await?;
        Ok(())
    }

    /// Names of targets that list `manifest` as a dependent.
    fn targets_depended_on_by(&self, manifest: &Path) -> Vec<String> {
        self.config
            .repos
            .values()
            .flat_map(|repo| &repo.targets)
            .filter(|target| {
                target
                    .dependents
                    .iter()
                    .any(|dependent| dependent.file_name() == manifest.file_name())
            })
            .map(|target| target.name())
            .collect()
    }

    /// Files below the workspace root matching `pattern`, sorted.
    fn find(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.config.root.join(pattern);
        let mut paths = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            paths.push(entry.map_err(glob::GlobError::into_error)?);
        }
        paths.sort();
        Ok(paths)
    }

    /// Files anywhere below the workspace root named like `manifest`.
    fn find_named(&self, manifest: &Path) -> Result<Vec<PathBuf>> {
        match manifest.file_name() {
            Some(name) => self.find(&format!("**/{}", name.to_string_lossy())),
            None => Ok(Vec::new()),
        }
    }
}
