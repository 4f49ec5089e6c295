//! Shared fixtures and fakes for integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use kodegen_release_pipeline::changelog::StaticEntries;
use kodegen_release_pipeline::publish::{
    HeadOutcome, ObjectStore, PushFlags, RegistryClient, RegistryError, StorageError,
};
use kodegen_release_pipeline::tools::Tool;
use kodegen_release_pipeline::vcs::Vcs;
use kodegen_release_pipeline::{ReleaseConfig, ReleaseEnv, ReleasePipeline, Result};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Scratch copy of `tests/fixtures`: a deploy workspace and, beside it, the
/// framework checkout it releases from.
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
    pub sdk: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        copy_tree(&fixtures, dir.path());

        Self {
            root: dir.path().join("workspace"),
            sdk: dir.path().join("sdk"),
            _dir: dir,
        }
    }

    pub fn config(&self) -> ReleaseConfig {
        ReleaseConfig::load(&self.root.join("release.toml"), &self.root).unwrap()
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.join(relative)).unwrap()
    }

    pub fn pipeline(&self) -> TestPipeline {
        self.pipeline_with(FakeVcs::default(), FakeRegistry::default())
    }

    pub fn pipeline_with(&self, vcs: FakeVcs, registry: FakeRegistry) -> TestPipeline {
        ReleasePipeline::new(
            self.config(),
            ReleaseEnv::Local,
            vcs,
            registry,
            MemoryStore::default(),
            StaticEntries(vec!["Faster segmentation".to_string()]),
        )
    }
}

/// Turn `dir` into a git repository on `master` with everything committed
/// and tagged `tag`. Returns `None` when git is not installed.
pub fn commit_and_tag(dir: &Path, tag: &str) -> Option<PathBuf> {
    let git = Tool::Git.require().ok()?;
    let run = |args: &[&str]| {
        let status = std::process::Command::new(&git)
            .arg("-C")
            .arg(dir)
            .args([
                "-c",
                "user.name=Release Bot",
                "-c",
                "user.email=release@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?}");
    };

    run(&["init", "-q"]);
    run(&["symbolic-ref", "HEAD", "refs/heads/master"]);
    run(&["add", "."]);
    run(&["commit", "-qm", "Release"]);
    run(&["tag", tag]);
    Some(git)
}

pub type TestPipeline = ReleasePipeline<FakeVcs, FakeRegistry, MemoryStore, StaticEntries>;

fn copy_tree(from: &Path, to: &Path) {
    for entry in WalkDir::new(from) {
        let entry = entry.unwrap();
        let dest = to.join(entry.path().strip_prefix(from).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
        } else {
            std::fs::copy(entry.path(), &dest).unwrap();
        }
    }
}

/// Records version control calls instead of running git.
#[derive(Default)]
pub struct FakeVcs {
    pub dirty: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Vcs for FakeVcs {
    async fn is_dirty(&self, _repo: &Path) -> Result<bool> {
        Ok(self.dirty)
    }

    async fn checkout(&self, _repo: &Path, rev: &str) -> Result<()> {
        self.record(format!("checkout {rev}"))
    }

    async fn pull(&self, _repo: &Path, branch: &str) -> Result<()> {
        self.record(format!("pull {branch}"))
    }

    async fn commit_all(&self, _repo: &Path, message: &str) -> Result<()> {
        self.record(format!("commit {message}"))
    }

    async fn tag(&self, _repo: &Path, name: &str, _message: &str) -> Result<()> {
        self.record(format!("tag {name}"))
    }

    async fn push_branch(&self, _repo: &Path) -> Result<()> {
        self.record("push branch".to_string())
    }

    async fn push_tags(&self, _repo: &Path) -> Result<()> {
        self.record("push tags".to_string())
    }

    async fn clone_repo(&self, url: &str, _dest: &Path) -> Result<()> {
        self.record(format!("clone {url}"))
    }
}

/// Registry holding published `(name, version)` pairs in memory.
#[derive(Default)]
pub struct FakeRegistry {
    pub published: Mutex<BTreeSet<(String, String)>>,
    pub pushes: Mutex<Vec<String>>,
    pub repo_pushes: Mutex<Vec<(String, String)>>,
    pub refreshes: Mutex<u32>,
}

impl FakeRegistry {
    pub fn with_published(name: &str, version: &str) -> Self {
        let registry = Self::default();
        registry
            .published
            .lock()
            .unwrap()
            .insert((name.to_string(), version.to_string()));
        registry
    }

    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> u32 {
        *self.refreshes.lock().unwrap()
    }
}

fn stem(manifest: &Path) -> String {
    manifest.file_stem().unwrap().to_string_lossy().into_owned()
}

impl RegistryClient for FakeRegistry {
    async fn exists(
        &self,
        name: &str,
        version: &Version,
    ) -> std::result::Result<bool, RegistryError> {
        Ok(self
            .published
            .lock()
            .unwrap()
            .contains(&(name.to_string(), version.to_string())))
    }

    async fn push(
        &self,
        manifest: &Path,
        _flags: PushFlags,
    ) -> std::result::Result<(), RegistryError> {
        let content = std::fs::read_to_string(manifest).unwrap();
        let version =
            kodegen_release_pipeline::version::parse_declared_version(&content, manifest).unwrap();
        self.pushes.lock().unwrap().push(stem(manifest));
        self.published
            .lock()
            .unwrap()
            .insert((stem(manifest), version.to_string()));
        Ok(())
    }

    async fn push_to_repo(
        &self,
        repo: &str,
        manifest: &Path,
    ) -> std::result::Result<(), RegistryError> {
        self.repo_pushes
            .lock()
            .unwrap()
            .push((repo.to_string(), stem(manifest)));
        Ok(())
    }

    async fn refresh_index(&self) -> std::result::Result<(), RegistryError> {
        *self.refreshes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Object store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<BTreeMap<(String, String), Bytes>>,
    pub puts: Mutex<u32>,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<(String, String)> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn puts(&self) -> u32 {
        *self.puts.lock().unwrap()
    }
}

impl ObjectStore for MemoryStore {
    async fn head(
        &self,
        bucket: &str,
        key: &str,
    ) -> std::result::Result<HeadOutcome, StorageError> {
        let exists = self
            .objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()));
        Ok(if exists {
            HeadOutcome::Exists
        } else {
            HeadOutcome::NotFound
        })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> std::result::Result<(), StorageError> {
        *self.puts.lock().unwrap() += 1;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
