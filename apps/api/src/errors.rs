use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::AuditError;
use crate::reader::ReadError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Audit pipeline failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ReadError> for AppError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::NotFound(id) => AppError::NotFound(format!("Audit {id} not found")),
            ReadError::CorruptRecord { .. } => AppError::CorruptRecord(e.to_string()),
            ReadError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::CorruptRecord(msg) => {
                tracing::error!("Corrupt record: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CORRUPT_RECORD",
                    msg.clone(),
                    None,
                )
            }
            AppError::Storage(e) => {
                if e.is_not_found() {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string(), None)
                } else {
                    tracing::error!("Storage error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "STORAGE_ERROR",
                        "A storage error occurred".to_string(),
                        None,
                    )
                }
            }
            // Pipeline failures carry the stage label so the operator can
            // tell what was already durably written (e.g. the document
            // uploaded fine but scoring failed).
            AppError::Audit(e) => {
                tracing::error!(stage = %e.stage(), "Audit pipeline failed: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AUDIT_FAILED",
                    e.to_string(),
                    Some(e.stage().label()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(stage) = stage {
            error["stage"] = json!(stage);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
