//! Shared API plumbing: the error response type and the blocking store helper.

use crate::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chorus_store::StoreError;
use chorus_voice::VoiceError;
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;

/// Error response for API handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// An upstream speech or language provider failed.
    BadGateway(String),
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Conflict(msg) | StoreError::AlreadyExists(msg) => ApiError::Conflict(msg),
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ApiError::InternalServerError("database error".to_string())
            }
            StoreError::Unavailable(msg) => {
                tracing::error!(error = %msg, "store unavailable");
                ApiError::InternalServerError(msg)
            }
        }
    }
}

impl From<VoiceError> for ApiError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InputTooLarge { .. } => ApiError::BadRequest(err.to_string()),
            VoiceError::Config(msg) => {
                tracing::error!(error = %msg, "provider is not configured");
                ApiError::InternalServerError(msg)
            }
            VoiceError::Transport(_) | VoiceError::Provider { .. } | VoiceError::Decode(_) => {
                tracing::warn!(error = %err, "provider call failed");
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

/// Runs a store operation on a pooled connection inside `spawn_blocking`.
pub(crate) async fn with_conn<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}
