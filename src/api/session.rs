//! Session lifecycle endpoints.

use axum::{extract::State, Extension};
use serde::Serialize;

use super::{error, respond, session_for, success, ApiResult};
use crate::auth::AuthenticatedUser;
use crate::models::SessionSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub was_loaded: bool,
}

/// GET /api/session - Full session snapshot, loading it on first use.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<SessionSnapshot> {
    let session = session_for(&state, &user).await?;
    let snapshot = session.snapshot().await;
    let revision_id = snapshot.revision_id;
    success(snapshot, revision_id)
}

/// POST /api/session/reload - Discard local state and reload from the stores.
pub async fn reload_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<SessionSnapshot> {
    match state.sessions.reload(&user.identity).await {
        Ok(session) => {
            let snapshot = session.snapshot().await;
            respond(&session, Ok(snapshot)).await
        }
        Err(e) => error(e.into(), 0),
    }
}

/// DELETE /api/session - Sign out and drop the session.
pub async fn end_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<SessionEnded> {
    let was_loaded = state.sessions.remove(&user.identity.uid).await;

    if let (Some(gateway), Some(token)) = (state.identity.clone(), user.token.clone()) {
        // Remote sign-out is best effort; the local session is already gone
        tokio::spawn(async move {
            if let Err(e) = gateway.sign_out(&token).await {
                tracing::warn!("Identity sign-out failed: {}", e);
            }
        });
    }

    tracing::info!("Session ended for {}", user.identity.label());
    success(SessionEnded { was_loaded }, 0)
}
