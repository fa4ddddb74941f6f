use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure kinds for the retrieval-augmented pipeline.
///
/// Each variant tags the stage that failed so callers can branch on the
/// failure kind instead of parsing an error string out of an answer.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch page: {0}")]
    Fetch(String),
    #[error("page produced no indexable content")]
    EmptyContent,
    #[error("embedding request failed: {0}")]
    Embedding(String),
    #[error("vector index error: {0}")]
    Store(String),
    #[error("generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
