//! REST API module.
//!
//! Every response carries the caller's session revision in `revisionId`.

mod outfits;
mod session;
mod wardrobe;

pub use outfits::*;
pub use session::*;
pub use wardrobe::*;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthenticatedUser;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::session::{SessionError, WardrobeSession};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Identifier echoed back by delete endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub id: String,
}

/// The caller's session, loaded on first use.
async fn session_for(
    state: &AppState,
    user: &AuthenticatedUser,
) -> Result<Arc<WardrobeSession>, AppErrorWithRevision> {
    state
        .sessions
        .get_or_load(&user.identity)
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e.into(),
            revision_id: 0,
        })
}

/// Wrap a session result with the revision reached after the operation.
async fn respond<T: Serialize>(
    session: &WardrobeSession,
    result: Result<T, SessionError>,
) -> ApiResult<T> {
    let revision_id = session.revision().await;
    match result {
        Ok(data) => success(data, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}
