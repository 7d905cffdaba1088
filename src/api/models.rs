//! API request and response models

use crate::estimator::ModelState;
use crate::models::FeatureRow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Request to assign clusters to feature rows
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub rows: Vec<FeatureRow>,
}

/// Cluster assignments, one per request row
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub labels: Vec<u32>,

    /// True when labels are demo stand-ins rather than model output
    pub demo: bool,
}

/// Request to upload a locally trained artifact
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveModelRequest {
    pub local_path: PathBuf,

    #[serde(default)]
    pub remove_after_upload: bool,
}

/// Model lifecycle status
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub bucket: String,
    pub key: String,
    /// Store backend name, absent in demo mode
    pub store: Option<String>,
    pub state: ModelState,
    /// Whether the artifact exists remotely
    pub present: bool,
}
