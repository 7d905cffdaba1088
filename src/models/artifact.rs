//! Serialized model artifacts
//!
//! Artifacts are JSON documents tagged by `kind`:
//! ```json
//! { "kind": "centroid", "centroids": [[0.1, 0.4], [1.2, -0.3]] }
//! ```

use super::{CentroidModel, ClusterModel};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Centroid(CentroidModel),
}

impl ModelArtifact {
    /// Decode and validate an artifact; `key` names it in errors
    pub fn from_slice(bytes: &[u8], key: &str) -> Result<Self, StoreError> {
        let artifact: Self = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            source: Box::new(e),
        })?;

        let validation = match &artifact {
            Self::Centroid(model) => model.validate(),
        };
        validation.map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            source: Box::new(e),
        })?;

        Ok(artifact)
    }

    pub fn into_model(self) -> Arc<dyn ClusterModel> {
        match self {
            Self::Centroid(model) => Arc::new(model),
        }
    }
}

/// Read a downloaded artifact into a ready-to-use model
pub async fn read_artifact(path: &Path, key: &str) -> Result<Arc<dyn ClusterModel>, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(ModelArtifact::from_slice(&bytes, key)?.into_model())
}

/// Write an artifact to a local file, ready for upload
pub async fn write_artifact(artifact: &ModelArtifact, path: &Path) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| StoreError::Corrupt {
        key: path.display().to_string(),
        source: Box::new(e),
    })?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| StoreError::io(path, e))
}
