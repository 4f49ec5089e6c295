//! Object storage backends for release archives.

use bytes::Bytes;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Result of a metadata-only existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadOutcome {
    Exists,
    NotFound,
}

/// Object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Transport-level HTTP failure
    #[error("request for {key} failed: {source}")]
    Http {
        /// Object key
        key: String,
        /// Client error
        #[source]
        source: reqwest::Error,
    },

    /// Status other than success or not-found
    #[error("unexpected status {status} for {key}")]
    UnexpectedStatus {
        /// Object key
        key: String,
        /// HTTP status code
        status: u16,
    },

    /// Endpoint URL could not be built
    #[error("invalid storage URL for {key}: {source}")]
    Url {
        /// Object key
        key: String,
        /// Parse error
        #[source]
        source: url::ParseError,
    },

    /// Local backend filesystem failure
    #[error("filesystem error for {key}: {source}")]
    Io {
        /// Object key
        key: String,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Environment has no bucket
    #[error("no release bucket configured for environment '{env}'")]
    MissingBucket {
        /// Release environment
        env: String,
    },
}

/// Storage service holding release archives.
pub trait ObjectStore {
    /// Check for an object without transferring its content.
    fn head(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<HeadOutcome, StorageError>> + Send;

    /// Store `body` under `key`.
    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Stores objects below a local directory as `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.root.join(bucket), |path, segment| path.join(segment))
    }
}

impl ObjectStore for FsObjectStore {
    async fn head(&self, bucket: &str, key: &str) -> Result<HeadOutcome, StorageError> {
        match tokio::fs::metadata(self.object_path(bucket, key)).await {
            Ok(_) => Ok(HeadOutcome::Exists),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HeadOutcome::NotFound),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key);
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &body).await.map_err(io_err)?;
        Ok(())
    }
}

/// Stores objects at `<endpoint>/<bucket>/<key>` over HTTP `HEAD`/`PUT`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpObjectStore {
    /// Creates a store for `endpoint`, optionally sending a bearer token.
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, StorageError> {
        let mut endpoint = Url::parse(endpoint).map_err(|source| StorageError::Url {
            key: String::new(),
            source,
        })?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        })
    }

    /// URL of an object.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        self.endpoint
            .join(&format!("{bucket}/{key}"))
            .map_err(|source| StorageError::Url {
                key: key.to_string(),
                source,
            })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl ObjectStore for HttpObjectStore {
    async fn head(&self, bucket: &str, key: &str) -> Result<HeadOutcome, StorageError> {
        let url = self.object_url(bucket, key)?;
        let response = self
            .authorize(self.client.head(url))
            .send()
            .await
            .map_err(|source| StorageError::Http {
                key: key.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(HeadOutcome::Exists)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(HeadOutcome::NotFound)
        } else {
            Err(StorageError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        let url = self.object_url(bucket, key)?;
        let response = self
            .authorize(self.client.put(url))
            .body(body)
            .send()
            .await
            .map_err(|source| StorageError::Http {
                key: key.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

/// Storage backend selected by configuration.
#[derive(Debug, Clone)]
pub enum ReleaseStore {
    Fs(FsObjectStore),
    Http(HttpObjectStore),
}

impl ObjectStore for ReleaseStore {
    async fn head(&self, bucket: &str, key: &str) -> Result<HeadOutcome, StorageError> {
        match self {
            ReleaseStore::Fs(store) => store.head(bucket, key).await,
            ReleaseStore::Http(store) => store.head(bucket, key).await,
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        match self {
            ReleaseStore::Fs(store) => store.put(bucket, key, body).await,
            ReleaseStore::Http(store) => store.put(bucket, key, body).await,
        }
    }
}
