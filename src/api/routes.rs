//! API route definitions

use crate::estimator::CustomerClusterEstimator;
use axum::{
    Router,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<CustomerClusterEstimator>,
    pub prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Uploads via `POST /model/save` must resolve inside this directory
    pub staging_dir: PathBuf,
}

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Model lifecycle
        .route("/model", get(handlers::model_info))
        .route("/model/save", post(handlers::save_model))
        // Prediction
        .route("/predict", post(handlers::predict))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
