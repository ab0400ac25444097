use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The entity source could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("owner repository unavailable: {0}")]
    Unavailable(String),
}

/// Failures that abort a whole aggregation run.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("failed to load owners: {0}")]
    Source(#[from] SourceError),

    #[error("malformed pet {pet_id} ({name:?}): {reason}")]
    MalformedPet {
        pet_id: u32,
        name: String,
        reason: String,
    },

    #[error("analysis of pet {pet_id} timed out")]
    Timeout { pet_id: u32 },

    #[error("analysis pool is closed")]
    PoolClosed,

    #[error("analysis worker dropped pet {pet_id} without replying")]
    WorkerDropped { pet_id: u32 },
}

// Errors surfaced by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("{} not found", what) })),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
