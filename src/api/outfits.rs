//! Outfit generation, rendering and saving endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{respond, session_for, ApiResult, Deleted};
use crate::auth::AuthenticatedUser;
use crate::models::{GenerateOutfitsRequest, GeneratedOutfit, RenderAllReport, SavedOutfit};
use crate::AppState;

/// POST /api/outfits/generate - Replace the generated batch with fresh proposals.
pub async fn generate_outfits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<GenerateOutfitsRequest>,
) -> ApiResult<Vec<GeneratedOutfit>> {
    let session = session_for(&state, &user).await?;
    let result = session
        .generate_outfits(&request.weather, request.occasion)
        .await;
    respond(&session, result).await
}

/// GET /api/outfits/generated - Current generated batch.
pub async fn list_generated(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<GeneratedOutfit>> {
    let session = session_for(&state, &user).await?;
    let outfits = session.generated_outfits().await;
    respond(&session, Ok(outfits)).await
}

/// POST /api/outfits/generated/render - Render every outfit not yet rendered.
pub async fn render_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<RenderAllReport> {
    let session = session_for(&state, &user).await?;
    let report = session.render_all().await;
    respond(&session, Ok(report)).await
}

/// POST /api/outfits/generated/{id}/render - Render one outfit.
pub async fn render_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<GeneratedOutfit> {
    let session = session_for(&state, &user).await?;
    let result = session.render_outfit(&id).await;
    respond(&session, result).await
}

/// POST /api/outfits/generated/{id}/save - Persist a generated outfit.
pub async fn save_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<SavedOutfit> {
    let session = session_for(&state, &user).await?;
    let result = session.save_outfit(&id).await;
    respond(&session, result).await
}

/// GET /api/outfits/saved - Saved outfits.
pub async fn list_saved(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<SavedOutfit>> {
    let session = session_for(&state, &user).await?;
    let outfits = session.saved_outfits().await;
    respond(&session, Ok(outfits)).await
}

/// DELETE /api/outfits/saved/{id} - Remove a saved outfit.
pub async fn unsave_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let session = session_for(&state, &user).await?;
    let result = session.unsave_outfit(&id).await.map(|()| Deleted { id: id.clone() });
    respond(&session, result).await
}
