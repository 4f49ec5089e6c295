//! Release configuration loaded from `release.toml`.
//!
//! The file is read once per invocation and resolved into an immutable
//! [`ReleaseConfig`]: model targets are expanded, defaults applied and paths
//! left relative to the workspace root.

use crate::error::{ReleaseError, Result};
use crate::publish::{FsObjectStore, HttpObjectStore, ReleaseStore, RetryPolicy, StorageError};
use crate::publish::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";

/// Environment variable holding the storage bearer token by default.
pub const DEFAULT_TOKEN_ENV: &str = "RELEASE_STORAGE_TOKEN";

/// Release environment, selecting the artifact bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReleaseEnv {
    #[default]
    Local,
    Production,
}

impl ReleaseEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseEnv::Local => "local",
            ReleaseEnv::Production => "production",
        }
    }
}

impl std::fmt::Display for ReleaseEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which registry a target is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Public,
    Private,
}

/// A publishable manifest and the build output bundled with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// Manifest path, relative to the framework checkout.
    pub manifest: PathBuf,
    pub registry: RegistryKind,
    /// Spec repository for private targets.
    pub pod_repo: Option<String>,
    /// Directories zipped into the target's archive, in order.
    pub bundled: Vec<PathBuf>,
    /// Manifests that depend on this target with an optimistic range.
    pub dependents: Vec<PathBuf>,
    pub refresh_before: bool,
    pub refresh_after: bool,
    pub synchronize: bool,
}

impl ReleaseTarget {
    /// Target name: the manifest file stem.
    pub fn name(&self) -> String {
        self.manifest
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn model(name: &str, umbrella: &Path) -> Self {
        Self {
            manifest: PathBuf::from(format!("{name}.podspec")),
            registry: RegistryKind::Public,
            pod_repo: None,
            bundled: vec![PathBuf::from(format!("Frameworks/{name}.framework"))],
            dependents: vec![umbrella.to_path_buf()],
            refresh_before: false,
            refresh_after: false,
            synchronize: true,
        }
    }
}

/// A release repository holding built frameworks.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub name: String,
    pub repo_url: String,
    /// Framework checkout, relative to the workspace root.
    pub framework_folder: PathBuf,
    /// Changelog, relative to the workspace root.
    pub changelog: PathBuf,
    /// Base URL for release links in changelog headings.
    pub link_base: String,
    /// File appended to every archive, relative to the framework checkout.
    pub license_file: PathBuf,
    pub main_branch: String,
    /// Targets in publish order.
    pub targets: Vec<ReleaseTarget>,
}

/// Artifact storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// HTTP endpoint; objects live at `<endpoint>/<bucket>/<key>`.
    pub endpoint: Option<String>,
    /// Local directory used instead of an endpoint.
    pub root: Option<PathBuf>,
    /// Variable holding a bearer token for the endpoint.
    pub token_env: Option<String>,
    /// Bucket per release environment.
    #[serde(default)]
    pub buckets: BTreeMap<String, String>,
}

impl StorageConfig {
    /// Bucket for `env`.
    pub fn bucket(&self, env: ReleaseEnv) -> std::result::Result<&str, StorageError> {
        self.buckets
            .get(env.as_str())
            .map(String::as_str)
            .ok_or_else(|| StorageError::MissingBucket {
                env: env.to_string(),
            })
    }

    /// Build the configured backend. Without an endpoint, objects are kept
    /// below `root` (default `release-artifacts`) in the workspace.
    pub fn build_store(&self, workspace: &Path) -> std::result::Result<ReleaseStore, StorageError> {
        match &self.endpoint {
            Some(endpoint) => {
                let token_env = self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV);
                let token = std::env::var(token_env).ok();
                Ok(ReleaseStore::Http(HttpObjectStore::new(endpoint, token)?))
            }
            None => {
                let root = self
                    .root
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("release-artifacts"));
                Ok(ReleaseStore::Fs(FsObjectStore::new(workspace.join(root))))
            }
        }
    }
}

/// Resolved release configuration.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// File the configuration was loaded from.
    pub path: PathBuf,
    /// Workspace root all other paths are relative to.
    pub root: PathBuf,
    pub main_branch: String,
    /// Manifest whose version drives `prepare`.
    pub core_manifest: PathBuf,
    pub base_manifest: PathBuf,
    pub umbrella_manifest: PathBuf,
    pub manifest_glob: String,
    pub optimistic_dependency: String,
    pub excluded_dependencies: Vec<String>,
    pub plist_glob: String,
    pub plist_version_key: String,
    pub core_plist_targets: Vec<String>,
    /// Model framework name to its variants.
    pub models: BTreeMap<String, Vec<String>>,
    pub storage: StorageConfig,
    pub retry: RetryPolicy,
    pub repos: BTreeMap<String, RepoConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_branch")]
    main_branch: String,
    #[serde(default = "default_core_manifest")]
    core_manifest: PathBuf,
    #[serde(default = "default_base_manifest")]
    base_manifest: PathBuf,
    #[serde(default = "default_umbrella_manifest")]
    umbrella_manifest: PathBuf,
    #[serde(default = "default_manifest_glob")]
    manifest_glob: String,
    #[serde(default = "default_optimistic_dependency")]
    optimistic_dependency: String,
    #[serde(default = "default_excluded")]
    excluded_dependencies: Vec<String>,
    #[serde(default = "default_plist_glob")]
    plist_glob: String,
    #[serde(default = "default_plist_key")]
    plist_version_key: String,
    #[serde(default = "default_core_plists")]
    core_plist_targets: Vec<String>,
    #[serde(default)]
    models: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    registry: RawRegistry,
    #[serde(default)]
    repos: BTreeMap<String, RawRepo>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegistry {
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_retry_interval")]
    retry_interval_secs: u64,
}

impl Default for RawRegistry {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepo {
    repo_url: String,
    framework_folder: PathBuf,
    changelog: Option<PathBuf>,
    link_base: String,
    #[serde(default = "default_license")]
    license_file: PathBuf,
    #[serde(default = "default_branch")]
    main_branch: String,
    #[serde(default)]
    targets: Vec<TargetSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetSpec {
    Explicit(ExplicitTarget),
    Models { models: bool },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplicitTarget {
    manifest: PathBuf,
    #[serde(default)]
    registry: RegistryKind,
    pod_repo: Option<String>,
    #[serde(default)]
    bundled: Vec<PathBuf>,
    #[serde(default)]
    dependents: Vec<PathBuf>,
    #[serde(default)]
    refresh_before: bool,
    #[serde(default)]
    refresh_after: bool,
    #[serde(default)]
    synchronize: bool,
}

fn default_branch() -> String {
    "master".to_string()
}
fn default_core_manifest() -> PathBuf {
    PathBuf::from("FritzCore.podspec")
}
fn default_base_manifest() -> PathBuf {
    PathBuf::from("FritzBase.podspec")
}
fn default_umbrella_manifest() -> PathBuf {
    PathBuf::from("Fritz.podspec")
}
fn default_manifest_glob() -> String {
    "**/*.podspec".to_string()
}
fn default_optimistic_dependency() -> String {
    "FritzBase/Vision".to_string()
}
fn default_excluded() -> Vec<String> {
    crate::version::rewriter::DEFAULT_EXCLUDED_DEPENDENCIES
        .iter()
        .map(|name| name.to_string())
        .collect()
}
fn default_plist_glob() -> String {
    "Source/*/Info.plist".to_string()
}
fn default_plist_key() -> String {
    crate::version::plist::DEFAULT_VERSION_KEY.to_string()
}
fn default_core_plists() -> Vec<String> {
    ["Fritz", "FritzVision", "FritzCore", "FritzManagedModel", "CoreMLHelpers"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_interval() -> u64 {
    DEFAULT_RETRY_INTERVAL.as_secs()
}
fn default_license() -> PathBuf {
    PathBuf::from("LICENSE.md")
}

impl ReleaseConfig {
    /// Load `path`, resolving paths against `root`.
    pub fn load(path: &Path, root: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReleaseError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to read: {e}"),
        })?;
        Self::from_toml_str(&text, path, root)
    }

    /// Parse configuration text. `path` is only used in error messages.
    pub fn from_toml_str(text: &str, path: &Path, root: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|e| ReleaseError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut repos = BTreeMap::new();
        for (name, repo) in raw.repos {
            let targets = expand_targets(repo.targets, &raw.models, &raw.umbrella_manifest);
            if let Some(target) = targets
                .iter()
                .find(|t| t.registry == RegistryKind::Private && t.pod_repo.is_none())
            {
                return Err(ReleaseError::Config {
                    path: path.to_path_buf(),
                    reason: format!(
                        "private target {} in repo {} needs a pod_repo",
                        target.name(),
                        name
                    ),
                });
            }

            let changelog = repo
                .changelog
                .unwrap_or_else(|| Path::new("deploy_resources").join(&name).join("CHANGELOG.md"));
            repos.insert(
                name.clone(),
                RepoConfig {
                    name,
                    repo_url: repo.repo_url,
                    framework_folder: repo.framework_folder,
                    changelog,
                    link_base: repo.link_base,
                    license_file: repo.license_file,
                    main_branch: repo.main_branch,
                    targets,
                },
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            main_branch: raw.main_branch,
            core_manifest: raw.core_manifest,
            base_manifest: raw.base_manifest,
            umbrella_manifest: raw.umbrella_manifest,
            manifest_glob: raw.manifest_glob,
            optimistic_dependency: raw.optimistic_dependency,
            excluded_dependencies: raw.excluded_dependencies,
            plist_glob: raw.plist_glob,
            plist_version_key: raw.plist_version_key,
            core_plist_targets: raw.core_plist_targets,
            models: raw.models,
            storage: raw.storage,
            retry: RetryPolicy::new(raw.registry.max_retries, raw.registry.retry_interval_secs),
            repos,
        })
    }

    /// Repository named `name`.
    pub fn repo(&self, name: &str) -> Result<&RepoConfig> {
        self.repos.get(name).ok_or_else(|| ReleaseError::UnknownName {
            kind: "repository",
            name: name.to_string(),
        })
    }

    /// Every model target name, e.g. `FritzVisionLabelModelFast`.
    pub fn model_target_names(&self) -> Vec<String> {
        model_names(&self.models)
    }

    /// Whether a manifest path names a model framework.
    pub fn is_model_manifest(&self, manifest: &Path) -> bool {
        let path = manifest.to_string_lossy();
        self.models.keys().any(|model| path.contains(model.as_str()))
    }

    /// Property list for a single target, e.g. `Source/FritzVision/Info.plist`.
    pub fn plist_path_for(&self, target: &str) -> PathBuf {
        PathBuf::from(self.plist_glob.replacen('*', target, 1))
    }

    /// Absolute path of a workspace-relative path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

fn model_names(models: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    models
        .iter()
        .flat_map(|(framework, variants)| {
            variants
                .iter()
                .map(move |variant| format!("{framework}{variant}"))
        })
        .collect()
}

fn expand_targets(
    specs: Vec<TargetSpec>,
    models: &BTreeMap<String, Vec<String>>,
    umbrella: &Path,
) -> Vec<ReleaseTarget> {
    let mut targets = Vec::new();
    for spec in specs {
        match spec {
            TargetSpec::Explicit(t) => targets.push(ReleaseTarget {
                manifest: t.manifest,
                registry: t.registry,
                pod_repo: t.pod_repo,
                bundled: t.bundled,
                dependents: t.dependents,
                refresh_before: t.refresh_before,
                refresh_after: t.refresh_after,
                synchronize: t.synchronize,
            }),
            TargetSpec::Models { models: true } => targets.extend(
                model_names(models)
                    .iter()
                    .map(|name| ReleaseTarget::model(name, umbrella)),
            ),
            TargetSpec::Models { models: false } => {}
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[models]
FritzVisionLabelModel = ["Fast"]
FritzVisionStyleModelPaintings = [""]

[storage]
root = "store"
[storage.buckets]
production = "fritz-releases"

[registry]
retry_interval_secs = 5

[repos.fritz-ai-ios-sdk]
repo_url = "git@github.com:fritzlabs/fritz-ai-ios-sdk.git"
framework_folder = "../fritz-ai-ios-sdk"
link_base = "https://github.com/fritzlabs/fritz-ai-ios-sdk"

[[repos.fritz-ai-ios-sdk.targets]]
manifest = "FritzBase.podspec"
bundled = ["Frameworks/FritzCore.framework", "Frameworks/Fritz.framework"]
refresh_after = true

[[repos.fritz-ai-ios-sdk.targets]]
models = true

[[repos.fritz-ai-ios-sdk.targets]]
manifest = "Fritz.podspec"
refresh_before = true
synchronize = true
"#;

    fn load() -> ReleaseConfig {
        ReleaseConfig::from_toml_str(CONFIG, Path::new("release.toml"), Path::new("/work")).unwrap()
    }

    #[test]
    fn expands_model_targets_in_place() {
        let config = load();
        let repo = config.repo("fritz-ai-ios-sdk").unwrap();
        let names: Vec<String> = repo.targets.iter().map(ReleaseTarget::name).collect();
        assert_eq!(
            names,
            vec![
                "FritzBase",
                "FritzVisionLabelModelFast",
                "FritzVisionStyleModelPaintings",
                "Fritz"
            ]
        );

        let model = &repo.targets[1];
        assert_eq!(
            model.bundled,
            vec![PathBuf::from("Frameworks/FritzVisionLabelModelFast.framework")]
        );
        assert!(model.synchronize);
        assert_eq!(model.dependents, vec![PathBuf::from("Fritz.podspec")]);
        assert!(repo.targets[0].refresh_after);
        assert!(repo.targets[3].refresh_before);
    }

    #[test]
    fn applies_defaults() {
        let config = load();
        assert_eq!(config.core_manifest, PathBuf::from("FritzCore.podspec"));
        assert_eq!(config.excluded_dependencies, vec!["OpenCV"]);
        assert_eq!(config.optimistic_dependency, "FritzBase/Vision");
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.interval.as_secs(), 5);

        let repo = config.repo("fritz-ai-ios-sdk").unwrap();
        assert_eq!(repo.license_file, PathBuf::from("LICENSE.md"));
        assert_eq!(repo.main_branch, "master");
        assert_eq!(
            repo.changelog,
            PathBuf::from("deploy_resources/fritz-ai-ios-sdk/CHANGELOG.md")
        );
    }

    #[test]
    fn buckets_are_per_environment() {
        let config = load();
        assert_eq!(config.storage.bucket(ReleaseEnv::Production).unwrap(), "fritz-releases");
        assert!(matches!(
            config.storage.bucket(ReleaseEnv::Local),
            Err(StorageError::MissingBucket { .. })
        ));
    }

    #[test]
    fn unknown_repo_is_reported() {
        assert!(matches!(
            load().repo("android"),
            Err(ReleaseError::UnknownName { kind: "repository", .. })
        ));
    }

    #[test]
    fn model_helpers() {
        let config = load();
        assert!(config.is_model_manifest(Path::new("FritzVisionLabelModelFast.podspec")));
        assert!(!config.is_model_manifest(Path::new("FritzBase.podspec")));
        assert_eq!(
            config.plist_path_for("FritzVision"),
            PathBuf::from("Source/FritzVision/Info.plist")
        );
    }

    #[test]
    fn private_targets_need_a_repo() {
        let text = r#"
[repos.sdk]
repo_url = "u"
framework_folder = "."
link_base = "l"
[[repos.sdk.targets]]
manifest = "Internal.podspec"
registry = "private"
"#;
        let err = ReleaseConfig::from_toml_str(text, Path::new("r.toml"), Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("needs a pod_repo"));
    }
}
