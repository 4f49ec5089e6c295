//! Publishing release archives to object storage and manifests to registries.

pub mod artifact;
pub mod cocoapods;
pub mod registry;
pub mod retry;
pub mod storage;

pub use artifact::{ArtifactPublisher, UploadOutcome, artifact_key};
pub use cocoapods::CocoaPodsCli;
pub use registry::{
    PublishReport, PushFlags, RegistryClient, RegistryError, RegistryOutcome, RegistryPublisher,
};
pub use retry::{AttemptOutcome, PublishAttempt, RetryPolicy};
pub use storage::{
    FsObjectStore, HeadOutcome, HttpObjectStore, ObjectStore, ReleaseStore, StorageError,
};
