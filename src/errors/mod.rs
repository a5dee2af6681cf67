//! Error handling module for the wardrobe backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::session::SessionError;

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const DATA_LOAD_ERROR: &str = "DATA_LOAD_ERROR";
    pub const INSUFFICIENT_WARDROBE: &str = "INSUFFICIENT_WARDROBE";
    pub const COMPOSITION_ERROR: &str = "COMPOSITION_ERROR";
    pub const RENDER_ERROR: &str = "RENDER_ERROR";
    pub const STORE_WRITE_ERROR: &str = "STORE_WRITE_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Operation conflicts with one already in flight
    Conflict(String),
    /// Session could not be loaded; the client must retry
    DataLoad(String),
    /// Not enough items for the requested operation
    InsufficientWardrobe {
        message: String,
        required: usize,
        actual: usize,
    },
    /// Outfit composer failed
    Composition(String),
    /// Rendering one outfit failed
    Render { message: String, outfit_id: String },
    /// Store rejected a write; local state was left untouched
    StoreWrite(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DataLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InsufficientWardrobe { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Composition(_) => StatusCode::BAD_GATEWAY,
            AppError::Render { .. } => StatusCode::BAD_GATEWAY,
            AppError::StoreWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::DataLoad(_) => codes::DATA_LOAD_ERROR,
            AppError::InsufficientWardrobe { .. } => codes::INSUFFICIENT_WARDROBE,
            AppError::Composition(_) => codes::COMPOSITION_ERROR,
            AppError::Render { .. } => codes::RENDER_ERROR,
            AppError::StoreWrite(_) => codes::STORE_WRITE_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::DataLoad(msg) => msg.clone(),
            AppError::InsufficientWardrobe { message, .. } => message.clone(),
            AppError::Composition(msg) => msg.clone(),
            AppError::Render { message, .. } => message.clone(),
            AppError::StoreWrite(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InsufficientWardrobe {
                required, actual, ..
            } => Some(serde_json::json!({ "required": required, "actual": actual })),
            AppError::Render { outfit_id, .. } => {
                Some(serde_json::json!({ "outfitId": outfit_id }))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

/// Session failures become messages tied to the operation that failed.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::DataLoad(_) => AppError::DataLoad(
                "Unable to load your wardrobe. Please reload the page.".to_string(),
            ),
            SessionError::InsufficientWardrobe { required, actual } => {
                let message = if required <= 1 {
                    "Add at least one item to your wardrobe first.".to_string()
                } else {
                    format!(
                        "Add at least {} items to your wardrobe to generate outfits.",
                        required
                    )
                };
                AppError::InsufficientWardrobe {
                    message,
                    required,
                    actual,
                }
            }
            SessionError::Composition(_) => AppError::Composition(
                "Sorry, something went wrong while suggesting outfits. Please try again."
                    .to_string(),
            ),
            SessionError::Render { outfit_id, .. } => AppError::Render {
                message: "The outfit render failed. Please try again.".to_string(),
                outfit_id,
            },
            SessionError::StoreWrite(msg) => AppError::StoreWrite(msg),
            SessionError::NotFound(msg) => AppError::NotFound(msg),
            SessionError::Validation(msg) => AppError::Validation(msg),
            SessionError::GenerationInProgress => {
                AppError::Conflict("Outfit generation is already in progress.".to_string())
            }
        }
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details: error.details(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}
