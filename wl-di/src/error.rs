//! Error types for wl-di
//!
//! `ImportError` is the pipeline-level taxonomy; `ApiError` is the HTTP
//! boundary type that maps each variant to a status code and error code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Import pipeline error taxonomy
#[derive(Debug, Error)]
pub enum ImportError {
    /// Unsupported MIME type, or an empty/unparseable file
    #[error("{0}")]
    Format(String),

    /// A row failed the schema contract; nothing is committed
    #[error("row {row}, field '{field}': {message}")]
    Schema {
        row: usize,
        field: &'static str,
        message: String,
    },

    /// Invalid caller configuration (e.g. unknown duplicate strategy)
    #[error("{0}")]
    Config(String),

    /// Natural-key collision under the strict-fail strategy
    #[error("{message}")]
    Conflict {
        message: String,
        duplicate_rows_in_payload: i64,
    },

    /// An identical upload is already being processed
    #[error("{0}")]
    InFlight(String),

    /// Bulk write or ledger failure
    #[error("Storage error: {0}")]
    Storage(#[from] wl_common::Error),
}

impl From<sqlx::Error> for ImportError {
    fn from(err: sqlx::Error) -> Self {
        ImportError::Storage(wl_common::Error::Database(err))
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unsupported or unparseable upload format (400)
    #[error("Format error: {0}")]
    Format(String),

    /// Schema violation in an uploaded row (422)
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Conflict (409) - duplicate natural keys or an in-flight identical upload
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        duplicate_rows_in_payload: Option<i64>,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// wl-common error
    #[error("Common error: {0}")]
    Common(#[from] wl_common::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Format(msg) => ApiError::Format(msg),
            ImportError::Schema { row, field, message } => ApiError::SchemaViolation(format!(
                "row {}, field '{}': {}",
                row, field, message
            )),
            ImportError::Config(msg) => ApiError::BadRequest(msg),
            ImportError::Conflict {
                message,
                duplicate_rows_in_payload,
            } => ApiError::Conflict {
                message,
                duplicate_rows_in_payload: Some(duplicate_rows_in_payload),
            },
            ImportError::InFlight(message) => ApiError::Conflict {
                message,
                duplicate_rows_in_payload: None,
            },
            ImportError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, duplicate_rows) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Format(msg) => (StatusCode::BAD_REQUEST, "FORMAT_ERROR", msg, None),
            ApiError::SchemaViolation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_VIOLATION", msg, None)
            }
            ApiError::Conflict {
                message,
                duplicate_rows_in_payload,
            } => (
                StatusCode::CONFLICT,
                "CONFLICT",
                message,
                duplicate_rows_in_payload,
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
                None,
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
                None,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
                None,
            ),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(count) = duplicate_rows {
            error["duplicateRowsInPayload"] = json!(count);
        }

        let body = Json(json!({ "error": error }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
