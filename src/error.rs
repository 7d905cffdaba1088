//! Error types for the estimator and API responses

use crate::models::ModelError;
use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`crate::CustomerClusterEstimator`]
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// A remote capability is required but was never configured
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Loading the artifact failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Uploading an artifact failed; the local file is left in place
    #[error("failed to save model from {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// The loaded model rejected the input
    #[error("prediction failed at {location}: {source}")]
    Prediction {
        location: &'static Location<'static>,
        #[source]
        source: ModelError,
    },
}

impl EstimatorError {
    /// Wrap a model failure, recording where it was raised
    #[track_caller]
    pub fn prediction(source: ModelError) -> Self {
        Self::Prediction {
            location: Location::caller(),
            source,
        }
    }
}

pub type EstimatorResult<T> = Result<T, EstimatorError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<EstimatorError> for ApiError {
    fn from(err: EstimatorError) -> Self {
        match err {
            EstimatorError::Configuration(msg) => ApiError::Unavailable(msg),
            EstimatorError::Prediction { source, .. } => ApiError::BadRequest(source.to_string()),
            EstimatorError::Store(StoreError::Io { .. }) => ApiError::Internal(err.into()),
            err @ (EstimatorError::Store(_) | EstimatorError::Save { .. }) => {
                tracing::warn!(error = %err, "Artifact store failure");
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}
