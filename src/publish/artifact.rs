//! Idempotent upload of release archives.

use super::storage::{HeadOutcome, ObjectStore};
use crate::bundler::calculate_sha256;
use crate::error::Result;
use bytes::Bytes;
use std::path::Path;

/// What `publish_if_absent` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Archive was uploaded; carries its SHA-256.
    Uploaded { sha256: String },
    /// An object already existed under the key.
    Skipped,
}

/// Storage key of a release archive: `{target}/{version}/{archive_basename}`.
pub fn artifact_key(target: &str, version: &str, archive_basename: &str) -> String {
    format!("{target}/{version}/{archive_basename}")
}

/// Uploads archives at most once per key.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher<S> {
    store: S,
}

impl<S: ObjectStore> ArtifactPublisher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload `archive` under `key` unless an object is already there.
    ///
    /// The archive is only read when the `HEAD` check reports it missing. Check
    /// failures other than not-found abort without uploading.
    pub async fn publish_if_absent(
        &self,
        bucket: &str,
        key: &str,
        archive: &Path,
    ) -> Result<UploadOutcome> {
        if self.store.head(bucket, key).await? == HeadOutcome::Exists {
            log::info!("Skipping {}: already exists in {}", key, bucket);
            return Ok(UploadOutcome::Skipped);
        }

        let sha256 = calculate_sha256(archive).await?;
        let body = Bytes::from(tokio::fs::read(archive).await?);
        let size = body.len();
        self.store.put(bucket, key, body).await?;

        log::info!(
            "Uploaded {} to {} ({} bytes, sha256 {})",
            key,
            bucket,
            size,
            sha256
        );
        Ok(UploadOutcome::Uploaded { sha256 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use crate::publish::storage::StorageError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingStore {
        objects: Mutex<Vec<String>>,
        puts: Mutex<u32>,
        fail_head: bool,
    }

    impl ObjectStore for CountingStore {
        async fn head(
            &self,
            _bucket: &str,
            key: &str,
        ) -> std::result::Result<HeadOutcome, StorageError> {
            if self.fail_head {
                return Err(StorageError::UnexpectedStatus {
                    key: key.to_string(),
                    status: 403,
                });
            }
            let exists = self.objects.lock().unwrap().iter().any(|k| k == key);
            Ok(if exists {
                HeadOutcome::Exists
            } else {
                HeadOutcome::NotFound
            })
        }

        async fn put(
            &self,
            _bucket: &str,
            key: &str,
            _body: Bytes,
        ) -> std::result::Result<(), StorageError> {
            *self.puts.lock().unwrap() += 1;
            self.objects.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn key_layout() {
        assert_eq!(
            artifact_key("FritzVision", "2.0.0", "FritzVision.zip"),
            "FritzVision/2.0.0/FritzVision.zip"
        );
    }

    #[tokio::test]
    async fn uploads_once_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Fritz.zip");
        std::fs::write(&archive, b"archive").unwrap();

        let publisher = ArtifactPublisher::new(CountingStore::default());
        let key = artifact_key("Fritz", "1.0.0", "Fritz.zip");

        let first = publisher.publish_if_absent("b", &key, &archive).await.unwrap();
        assert!(matches!(first, UploadOutcome::Uploaded { .. }));
        let second = publisher.publish_if_absent("b", &key, &archive).await.unwrap();
        assert_eq!(second, UploadOutcome::Skipped);
        assert_eq!(*publisher.store().puts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn skipped_archive_is_never_read() {
        let store = CountingStore::default();
        store.objects.lock().unwrap().push("Fritz/1.0.0/Fritz.zip".to_string());
        let publisher = ArtifactPublisher::new(store);

        let outcome = publisher
            .publish_if_absent("b", "Fritz/1.0.0/Fritz.zip", Path::new("/nonexistent/Fritz.zip"))
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Skipped);
    }

    #[tokio::test]
    async fn head_error_aborts() {
        let publisher = ArtifactPublisher::new(CountingStore {
            fail_head: true,
            ..Default::default()
        });
        let err = publisher
            .publish_if_absent("b", "k", Path::new("unused.zip"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Storage(StorageError::UnexpectedStatus { status: 403, .. })
        ));
        assert_eq!(*publisher.store().puts.lock().unwrap(), 0);
    }
}
