//! Model lifecycle manager
//!
//! [`CustomerClusterEstimator`] decides which model backs predictions:
//!
//! ```text
//! Unloaded --load succeeds-----------> Loaded (cached for the estimator's lifetime)
//! Unloaded --no store configured-----> Demo   (never retried)
//! Unloaded --load fails with error---> Unloaded (error returned, next call retries)
//! ```
//!
//! Without a store the estimator keeps serving: existence checks answer
//! `false` and predictions come from the demo sampler. Only `save_model`
//! treats a missing store as an error.

use crate::config::{EstimatorConfig, ModelSettings};
use crate::error::{EstimatorError, EstimatorResult};
use crate::metrics;
use crate::models::{ClusterModel, FeatureRow, demo_labels, read_artifact};
use crate::store::{self, ArtifactStore, with_timeout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Where a trained artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLocation {
    pub bucket: String,
    pub key: String,
}

impl ModelLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Which model currently backs predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// No load attempted yet
    Unloaded,
    /// A real model is cached
    Loaded,
    /// No store available; predictions are stand-ins
    Demo,
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loaded => write!(f, "loaded"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

enum Cached {
    Loaded(Arc<dyn ClusterModel>),
    Demo,
}

pub struct CustomerClusterEstimator {
    location: ModelLocation,
    store: Option<Arc<dyn ArtifactStore>>,
    cluster_count: usize,
    cache_dir: PathBuf,
    remote_timeout: Duration,
    /// Unset until the first prediction; initialization is single-flight
    cached: OnceCell<Cached>,
}

impl CustomerClusterEstimator {
    /// Create an estimator, connecting to the configured store
    ///
    /// A store that cannot be initialized (missing credentials, bad config)
    /// downgrades the estimator to demo mode instead of failing.
    pub fn new(config: &EstimatorConfig) -> Self {
        let store = match store::connect(&config.store) {
            Ok(store) => {
                tracing::info!(backend = store.name(), "Artifact store connected");
                Some(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Artifact store unavailable, running in demo mode");
                None
            }
        };

        Self::new_with_store(
            ModelLocation::new(&config.model.bucket, &config.model.key),
            store,
            &config.model,
            config.store.timeout(),
        )
    }

    /// Create an estimator with an explicit (or absent) store
    pub fn new_with_store(
        location: ModelLocation,
        store: Option<Arc<dyn ArtifactStore>>,
        settings: &ModelSettings,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            location,
            store,
            cluster_count: settings.cluster_count.max(1),
            cache_dir: settings.cache_dir.clone(),
            remote_timeout,
            cached: OnceCell::new(),
        }
    }

    pub fn location(&self) -> &ModelLocation {
        &self.location
    }

    /// Name of the connected store backend, if any
    pub fn store_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|s| s.name())
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    pub fn state(&self) -> ModelState {
        match self.cached.get() {
            None => ModelState::Unloaded,
            Some(Cached::Loaded(_)) => ModelState::Loaded,
            Some(Cached::Demo) => ModelState::Demo,
        }
    }

    /// Check whether an object exists in the model bucket
    ///
    /// Never fails: no store, an empty key, or any store error all answer `false`.
    pub async fn is_model_present(&self, key: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        if key.is_empty() {
            tracing::warn!("Empty model key, treating as absent");
            return false;
        }

        let check = store.exists(&self.location.bucket, key);
        match with_timeout(self.remote_timeout, "exists", check).await {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(
                    bucket = %self.location.bucket,
                    key = %key,
                    error = %e,
                    "Could not check artifact store"
                );
                metrics::record_store_error("exists");
                false
            }
        }
    }

    /// Fetch and decode the model artifact
    ///
    /// Returns `Ok(None)` when no store is configured. Download and decode
    /// failures are returned as errors. The result is not cached here.
    pub async fn load_model(&self) -> EstimatorResult<Option<Arc<dyn ClusterModel>>> {
        let Some(store) = &self.store else {
            tracing::warn!("Artifact store not configured, no model to load (demo mode)");
            return Ok(None);
        };

        let local_path = self.local_artifact_path();
        tracing::info!(location = %self.location, path = ?local_path, "Loading model");

        let download = store.download(&self.location.bucket, &self.location.key, &local_path);
        if let Err(e) = with_timeout(self.remote_timeout, "download", download).await {
            metrics::record_store_error("download");
            metrics::record_model_load("error");
            return Err(e.into());
        }

        let model = read_artifact(&local_path, &self.location.key)
            .await
            .inspect_err(|_| metrics::record_model_load("corrupt"))?;

        metrics::record_model_load("success");
        tracing::info!(
            location = %self.location,
            clusters = model.n_clusters(),
            "Model loaded"
        );
        Ok(Some(model))
    }

    /// Upload a local artifact to the model location
    ///
    /// The local file is removed only after the upload succeeds.
    pub async fn save_model(
        &self,
        local_path: &Path,
        remove_after_upload: bool,
    ) -> EstimatorResult<()> {
        let Some(store) = &self.store else {
            return Err(EstimatorError::Configuration(
                "remote store not configured".to_string(),
            ));
        };

        let upload = store.upload(local_path, &self.location.bucket, &self.location.key);
        with_timeout(self.remote_timeout, "upload", upload)
            .await
            .map_err(|source| {
                metrics::record_store_error("upload");
                EstimatorError::Save {
                    path: local_path.to_path_buf(),
                    source,
                }
            })?;

        metrics::record_upload();
        tracing::info!(location = %self.location, path = ?local_path, "Model saved");

        if remove_after_upload && let Err(e) = tokio::fs::remove_file(local_path).await {
            tracing::warn!(
                path = ?local_path,
                error = %e,
                "Model uploaded but local copy could not be removed"
            );
        }

        Ok(())
    }

    /// Assign a cluster label to every row
    ///
    /// The first call loads the model; concurrent first calls share one load.
    /// In demo mode every call logs a warning and returns stand-in labels.
    pub async fn predict(&self, rows: &[FeatureRow]) -> EstimatorResult<Vec<u32>> {
        let cached = self
            .cached
            .get_or_try_init(|| async {
                Ok::<_, EstimatorError>(match self.load_model().await? {
                    Some(model) => Cached::Loaded(model),
                    None => {
                        metrics::record_demo_mode(self.location.to_string());
                        Cached::Demo
                    }
                })
            })
            .await?;

        match cached {
            Cached::Loaded(model) => {
                let labels = match model.predict(rows) {
                    Ok(labels) => labels,
                    Err(e) => return Err(EstimatorError::prediction(e)),
                };
                metrics::record_prediction("model", rows.len());
                Ok(labels)
            }
            Cached::Demo => {
                tracing::warn!(
                    rows = rows.len(),
                    clusters = self.cluster_count,
                    "No model available, returning demo cluster assignments"
                );
                metrics::record_prediction("demo", rows.len());
                Ok(demo_labels(rows.len(), self.cluster_count))
            }
        }
    }

    /// `{cache_dir}/{bucket}/{key}`
    fn local_artifact_path(&self) -> PathBuf {
        let mut path = self.cache_dir.join(&self.location.bucket);
        for part in self.location.key.split('/').filter(|p| !p.is_empty() && *p != "..") {
            path.push(part);
        }
        path
    }
}
