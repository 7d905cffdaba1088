//! Filesystem-backed artifact store
//!
//! Layout: `{root}/{bucket}/{key}`. Keys use `/` separators regardless of
//! platform.

use super::{ArtifactStore, StoreError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Suffix of in-flight upload files: `.{name}.{pid}-{seq}.upload`
const UPLOAD_SUFFIX: &str = ".upload";

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Open a store rooted at an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Misconfigured(format!(
                "local store root {:?} is not a directory",
                root
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `(bucket, key)` to a path inside the root
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.join(Self::segment(bucket)?);
        for part in key.split('/').filter(|p| !p.is_empty()) {
            path.push(Self::segment(part)?);
        }
        Ok(path)
    }

    /// Reject empty names and anything that would escape the root
    fn segment(name: &str) -> Result<&str, StoreError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(name),
            _ => Err(StoreError::Misconfigured(format!(
                "invalid object path segment '{}'",
                name
            ))),
        }
    }

    /// Private sibling of `target` that no other upload can share
    fn upload_temp_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
        target.with_file_name(format!(
            ".{}.{}-{}{}",
            name,
            std::process::id(),
            seq,
            UPLOAD_SUFFIX
        ))
    }

    fn is_upload_temp(name: &str) -> bool {
        name.starts_with('.') && name.ends_with(UPLOAD_SUFFIX)
    }

    async fn collect_keys(dir: PathBuf, prefix: String, keys: &mut Vec<String>) -> std::io::Result<()> {
        let mut stack = vec![(dir, prefix)];
        while let Some((dir, prefix)) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if Self::is_upload_temp(&name) {
                    continue;
                }
                let key = if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                };
                if entry.file_type().await?.is_dir() {
                    stack.push((entry.path(), key));
                } else {
                    keys.push(key);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let path = self.object_path(bucket, key)?;
        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(exists && path.is_file())
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StoreError> {
        let source = self.object_path(bucket, key)?;
        if !source.is_file() {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        fs::copy(&source, local_path)
            .await
            .map_err(|e| StoreError::io(&source, e))?;

        tracing::debug!(bucket = %bucket, key = %key, path = ?local_path, "Downloaded object");
        Ok(())
    }

    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StoreError> {
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        // Atomic write: copy to temp file, then rename
        let temp_file = Self::upload_temp_path(&target);
        if let Err(e) = fs::copy(local_path, &temp_file).await {
            let _ = fs::remove_file(&temp_file).await;
            return Err(StoreError::io(local_path, e));
        }
        if let Err(e) = fs::rename(&temp_file, &target).await {
            let _ = fs::remove_file(&temp_file).await;
            return Err(StoreError::io(&target, e));
        }

        tracing::debug!(bucket = %bucket, key = %key, path = ?local_path, "Uploaded object");
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, StoreError> {
        let bucket_dir = self.root.join(Self::segment(bucket)?);
        if !bucket_dir.is_dir() {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: prefix.unwrap_or_default().to_string(),
            });
        }

        let mut keys = Vec::new();
        Self::collect_keys(bucket_dir.clone(), String::new(), &mut keys)
            .await
            .map_err(|e| StoreError::io(&bucket_dir, e))?;

        if let Some(prefix) = prefix {
            keys.retain(|k| k.starts_with(prefix));
        }
        keys.sort();
        Ok(keys)
    }
}
