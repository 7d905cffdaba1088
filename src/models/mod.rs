//! Clustering models
//!
//! Provides:
//! - The [`ClusterModel`] prediction capability the estimator depends on
//! - [`CentroidModel`], a nearest-centroid (k-means) segmentation model
//! - [`ModelArtifact`], the serialized artifact format stored remotely
//! - Demo-mode label sampling

pub mod artifact;
pub mod centroid;
pub mod demo;

pub use artifact::{ModelArtifact, read_artifact, write_artifact};
pub use centroid::CentroidModel;
pub use demo::demo_labels;

use thiserror::Error;

/// A row of numeric customer features
pub type FeatureRow = Vec<f64>;

/// Errors raised while predicting or validating a model
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("row {row} has {actual} features, model expects {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} feature {feature} is not a finite number")]
    NonFiniteFeature { row: usize, feature: usize },

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Anything that can assign cluster labels to feature rows
pub trait ClusterModel: Send + Sync {
    /// One label per input row, each in `[0, n_clusters())`
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u32>, ModelError>;

    fn n_clusters(&self) -> usize;
}
