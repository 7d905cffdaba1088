//! Amazon S3 artifact store using the object_store crate

use super::{ArtifactStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;

const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// S3 store with one lazily built client per bucket
pub struct S3ArtifactStore {
    region: String,
    endpoint: Option<String>,
    clients: DashMap<String, Arc<AmazonS3>>,
}

impl std::fmt::Debug for S3ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ArtifactStore")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("buckets", &self.clients.len())
            .finish()
    }
}

impl S3ArtifactStore {
    /// Create a store using credentials from the environment
    ///
    /// Fails with [`StoreError::MissingCredentials`] when the access key pair
    /// is not set, so that callers can detect the unconfigured case up front
    /// instead of on the first request.
    pub fn from_env(region: &str, endpoint: Option<String>) -> Result<Self, StoreError> {
        for var in [ACCESS_KEY_VAR, SECRET_KEY_VAR] {
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(StoreError::MissingCredentials(format!("{} is not set", var)));
                }
            }
        }

        if region.trim().is_empty() {
            return Err(StoreError::Misconfigured("AWS region is empty".to_string()));
        }

        Ok(Self {
            region: region.to_string(),
            endpoint,
            clients: DashMap::new(),
        })
    }

    fn client(&self, bucket: &str) -> Result<Arc<AmazonS3>, StoreError> {
        if let Some(client) = self.clients.get(bucket) {
            return Ok(client.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(&self.region)
            .with_bucket_name(bucket);
        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let client = Arc::new(builder.build()?);
        tracing::debug!(bucket = %bucket, region = %self.region, "Created S3 client");

        Ok(self
            .clients
            .entry(bucket.to_string())
            .or_insert(client)
            .clone())
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let client = self.client(bucket)?;
        match client.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StoreError> {
        let client = self.client(bucket)?;
        let result = client
            .get(&ObjectPath::from(key))
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                },
                other => other.into(),
            })?;
        let bytes = result.bytes().await?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|e| StoreError::io(local_path, e))?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len(),
            "Downloaded object from S3"
        );
        Ok(())
    }

    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StoreError> {
        let client = self.client(bucket)?;
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StoreError::io(local_path, e))?;
        let size = data.len();

        client
            .put(&ObjectPath::from(key), PutPayload::from(data))
            .await?;

        tracing::debug!(bucket = %bucket, key = %key, size_bytes = size, "Uploaded object to S3");
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, StoreError> {
        let client = self.client(bucket)?;
        let prefix = prefix.map(ObjectPath::from);
        let objects: Vec<_> = client.list(prefix.as_ref()).try_collect().await?;

        let mut keys: Vec<String> = objects.into_iter().map(|o| o.location.to_string()).collect();
        keys.sort();
        Ok(keys)
    }
}
