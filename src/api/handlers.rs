//! API request handlers

use super::models::{HealthResponse, ModelInfo, PredictRequest, PredictResponse, SaveModelRequest};
use super::routes::AppState;
use crate::error::ApiError;
use crate::estimator::ModelState;
use crate::models::ModelArtifact;
use axum::{Json, extract::State, http::StatusCode};
use std::path::{Path, PathBuf};

/// GET /health - Service health check
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
        }),
    )
}

/// GET /metrics - Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// GET /model - Model location, store and load state
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    let estimator = &state.estimator;
    let location = estimator.location();

    Json(ModelInfo {
        bucket: location.bucket.clone(),
        key: location.key.clone(),
        store: estimator.store_name().map(str::to_string),
        state: estimator.state(),
        present: estimator.is_model_present(&location.key).await,
    })
}

/// POST /predict - Assign clusters to feature rows
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    if req.rows.is_empty() {
        return Err(ApiError::BadRequest("rows must not be empty".to_string()));
    }

    let labels = state.estimator.predict(&req.rows).await?;

    Ok(Json(PredictResponse {
        labels,
        demo: state.estimator.state() == ModelState::Demo,
    }))
}

/// POST /model/save - Upload a staged artifact to the model location
///
/// `local_path` must resolve inside the staging directory and decode as a
/// model artifact; anything else is rejected before the store is touched.
pub async fn save_model(
    State(state): State<AppState>,
    Json(req): Json<SaveModelRequest>,
) -> Result<StatusCode, ApiError> {
    let path = staged_artifact(&state.staging_dir, &req.local_path).await?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::BadRequest(format!("cannot read {:?}: {}", req.local_path, e)))?;
    ModelArtifact::from_slice(&bytes, &state.estimator.location().key)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .estimator
        .save_model(&path, req.remove_after_upload)
        .await?;

    tracing::info!(path = ?path, "Model saved via API");
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve `requested` to a regular file under `staging_dir`
async fn staged_artifact(staging_dir: &Path, requested: &Path) -> Result<PathBuf, ApiError> {
    let staging = tokio::fs::canonicalize(staging_dir).await.map_err(|e| {
        tracing::error!(staging_dir = ?staging_dir, error = %e, "Staging dir unavailable");
        ApiError::Unavailable("staging directory unavailable".to_string())
    })?;
    let requested = if requested.is_relative() {
        staging.join(requested)
    } else {
        requested.to_path_buf()
    };

    let resolved = tokio::fs::canonicalize(&requested)
        .await
        .map_err(|_| ApiError::BadRequest(format!("no staged artifact at {:?}", requested)))?;
    if !resolved.starts_with(&staging) {
        tracing::warn!(path = ?requested, "Rejected upload from outside the staging dir");
        return Err(ApiError::BadRequest(format!(
            "{:?} is outside the staging directory",
            requested
        )));
    }
    if !resolved.is_file() {
        return Err(ApiError::BadRequest(format!(
            "{:?} is not a regular file",
            requested
        )));
    }

    Ok(resolved)
}
