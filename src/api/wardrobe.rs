//! Wardrobe item and set endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{error, respond, session_for, ApiResult, Deleted};
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;
use crate::models::{
    AddItemsReport, AddItemsRequest, CreateSetRequest, ImageUpload, ItemFilter, SetAssignment,
    WardrobeAnalysis, WardrobeView,
};
use crate::AppState;

/// Largest number of images accepted in one upload.
pub const MAX_IMAGES_PER_UPLOAD: usize = 20;

/// GET /api/wardrobe - Items grouped by category, optionally filtered.
pub async fn get_wardrobe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(filter): Query<ItemFilter>,
) -> ApiResult<WardrobeView> {
    let session = session_for(&state, &user).await?;
    let view = session.wardrobe_view(&filter).await;
    respond(&session, Ok(view)).await
}

/// POST /api/wardrobe/items - Classify and store uploaded images.
pub async fn add_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<AddItemsRequest>,
) -> ApiResult<AddItemsReport> {
    let session = session_for(&state, &user).await?;
    let revision_id = session.revision().await;

    if request.images.len() > MAX_IMAGES_PER_UPLOAD {
        return error(
            AppError::Validation(format!(
                "At most {} images can be uploaded at once",
                MAX_IMAGES_PER_UPLOAD
            )),
            revision_id,
        );
    }

    let mut uploads: Vec<ImageUpload> = Vec::with_capacity(request.images.len());
    for (index, image) in request.images.iter().enumerate() {
        match image.decode() {
            Ok(upload) => uploads.push(upload),
            Err(reason) => {
                return error(
                    AppError::Validation(format!("Image {}: {}", index + 1, reason)),
                    revision_id,
                )
            }
        }
    }

    let result = session.add_items(uploads).await;
    respond(&session, result).await
}

/// DELETE /api/wardrobe/items/{id} - Delete an item and its image.
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let session = session_for(&state, &user).await?;
    let result = session.delete_item(&id).await.map(|()| Deleted { id: id.clone() });
    respond(&session, result).await
}

/// POST /api/wardrobe/sets - Link items into a set.
pub async fn create_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateSetRequest>,
) -> ApiResult<SetAssignment> {
    let session = session_for(&state, &user).await?;
    let result = session.create_set(&request.item_ids).await;
    respond(&session, result).await
}

/// DELETE /api/wardrobe/sets/{setId} - Unlink every item of a set.
pub async fn break_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(set_id): Path<String>,
) -> ApiResult<SetAssignment> {
    let session = session_for(&state, &user).await?;
    let result = session.break_set(&set_id).await;
    respond(&session, result).await
}

/// POST /api/wardrobe/analysis - Suggest what the wardrobe is missing.
pub async fn analyze_wardrobe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<WardrobeAnalysis> {
    let session = session_for(&state, &user).await?;
    let result = session.analyze_wardrobe_gaps().await;
    respond(&session, result).await
}
