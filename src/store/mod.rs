//! Remote artifact store
//!
//! An opaque blob store addressed by `(bucket, key)`. Backends:
//! - [`S3ArtifactStore`] for Amazon S3 and S3-compatible endpoints
//! - [`LocalArtifactStore`] for a directory tree where each bucket is a subdirectory

pub mod local;
pub mod s3;

pub use local::LocalArtifactStore;
pub use s3::S3ArtifactStore;

use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by an artifact store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid store configuration: {0}")]
    Misconfigured(String),

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    #[error("corrupt artifact {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error: {0}")]
    Backend(#[from] object_store::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Blob store capability consumed by the estimator
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Backend name for logs and status output
    fn name(&self) -> &'static str;

    /// Check whether an object exists
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;

    /// Download an object to a local file, creating parent directories
    async fn download(&self, bucket: &str, key: &str, local_path: &Path)
    -> Result<(), StoreError>;

    /// Upload a local file as an object
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// List object keys under a prefix, sorted
    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, StoreError>;
}

/// Build the configured backend
///
/// Fails when the backend cannot be initialized (e.g. missing AWS credentials);
/// callers decide whether that is fatal.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn ArtifactStore>, StoreError> {
    match config.backend {
        StoreBackend::S3 => Ok(Arc::new(S3ArtifactStore::from_env(
            &config.region,
            config.endpoint.clone(),
        )?)),
        StoreBackend::Local => {
            let root = config.local_root.as_ref().ok_or_else(|| {
                StoreError::Misconfigured("local backend requires local_root".to_string())
            })?;
            Ok(Arc::new(LocalArtifactStore::new(root)?))
        }
    }
}

/// Bound a store operation, surfacing expiry as [`StoreError::Timeout`]
pub async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            limit,
        }),
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// In-memory store with call counters and error injection
    #[derive(Default)]
    pub struct MockStore {
        objects: RwLock<HashMap<(String, String), Vec<u8>>>,
        exists_error: RwLock<Option<String>>,
        download_error: RwLock<Option<String>>,
        upload_error: RwLock<Option<String>>,
        download_delay: RwLock<Option<Duration>>,
        pub exists_calls: AtomicUsize,
        pub download_calls: AtomicUsize,
        pub upload_calls: AtomicUsize,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
            self.objects
                .write()
                .await
                .insert((bucket.to_string(), key.to_string()), data);
        }

        pub async fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.objects
                .read()
                .await
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }

        /// Fail every existence check with this message
        pub async fn set_exists_error(&self, error: String) {
            *self.exists_error.write().await = Some(error);
        }

        /// Fail every download with this message
        pub async fn set_download_error(&self, error: String) {
            *self.download_error.write().await = Some(error);
        }

        /// Fail every upload with this message
        pub async fn set_upload_error(&self, error: String) {
            *self.upload_error.write().await = Some(error);
        }

        /// Sleep before completing each download
        pub async fn set_download_delay(&self, delay: Duration) {
            *self.download_delay.write().await = Some(delay);
        }

        pub fn downloads(&self) -> usize {
            self.download_calls.load(Ordering::SeqCst)
        }

        fn injected(message: &str) -> StoreError {
            StoreError::Backend(object_store::Error::Generic {
                store: "mock",
                source: message.to_string().into(),
            })
        }
    }

    #[async_trait]
    impl ArtifactStore for MockStore {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.exists_error.read().await.as_deref() {
                return Err(Self::injected(error));
            }
            Ok(self.get_object(bucket, key).await.is_some())
        }

        async fn download(
            &self,
            bucket: &str,
            key: &str,
            local_path: &Path,
        ) -> Result<(), StoreError> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.download_delay.read().await;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = self.download_error.read().await.as_deref() {
                return Err(Self::injected(error));
            }

            let data = self
                .get_object(bucket, key)
                .await
                .ok_or_else(|| StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })?;

            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
            tokio::fs::write(local_path, data)
                .await
                .map_err(|e| StoreError::io(local_path, e))
        }

        async fn upload(
            &self,
            local_path: &Path,
            bucket: &str,
            key: &str,
        ) -> Result<(), StoreError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.upload_error.read().await.as_deref() {
                return Err(Self::injected(error));
            }

            let data = tokio::fs::read(local_path)
                .await
                .map_err(|e| StoreError::io(local_path, e))?;
            self.put_object(bucket, key, data).await;
            Ok(())
        }

        async fn list(
            &self,
            bucket: &str,
            prefix: Option<&str>,
        ) -> Result<Vec<String>, StoreError> {
            let mut keys: Vec<String> = self
                .objects
                .read()
                .await
                .keys()
                .filter(|(b, k)| b == bucket && prefix.is_none_or(|p| k.starts_with(p)))
                .map(|(_, k)| k.clone())
                .collect();
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), "exists", async { Ok(true) }).await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<(), StoreError> =
            with_timeout(Duration::from_millis(10), "download", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(err @ StoreError::Timeout { .. }) => {
                assert_eq!(err.to_string(), "download timed out after 10ms");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_local_without_root() {
        let config = StoreConfig {
            backend: StoreBackend::Local,
            ..Default::default()
        };
        assert!(matches!(
            connect(&config),
            Err(StoreError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_connect_local() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Local,
            local_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let store = connect(&config).unwrap();
        assert_eq!(store.name(), "local");
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            bucket: "models".to_string(),
            key: "model/model.json".to_string(),
        };
        assert_eq!(err.to_string(), "object not found: models/model/model.json");
    }
}
