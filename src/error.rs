//! Crate-wide error type.
//!
//! Kinds map 1:1 onto the HTTP surfaces in spec §7. `IntoResponse` renders
//! the `{ "error": string, "details"?: any }` body the same way the
//! teacher's `auth::middleware::AuthError` renders its own status/body pair.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            fields: vec![field.to_string()],
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Internal(anyhow::Error::new(e))
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            EngineError::NotFound(_) => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            EngineError::Conflict(_) => {
                (StatusCode::CONFLICT, json!({ "error": self.to_string() }))
            }
            EngineError::Validation { message, fields } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "details": fields }),
            ),
            EngineError::PreconditionFailed(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            EngineError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
