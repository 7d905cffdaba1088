//! Cluster Estimator - customer segmentation model lifecycle manager
//!
//! Loads a trained clustering model from object storage on first use, serves
//! predictions from the in-memory copy, and falls back to a clearly-marked demo
//! predictor when the store or its credentials are unavailable.

pub mod api;
pub mod config;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod models;
pub mod store;

pub use config::{EstimatorConfig, ModelSettings, StoreBackend, StoreConfig};
pub use error::{ApiError, EstimatorError, EstimatorResult};
pub use estimator::{CustomerClusterEstimator, ModelLocation, ModelState};
pub use models::{CentroidModel, ClusterModel, ModelArtifact, ModelError};
pub use store::{ArtifactStore, LocalArtifactStore, S3ArtifactStore, StoreError};
