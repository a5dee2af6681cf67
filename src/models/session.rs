//! Views and reports returned by wardrobe session operations.

use serde::Serialize;

use super::{ClothingCategory, ClothingItem, GeneratedOutfit, SavedOutfit};
use crate::auth::UserIdentity;

/// Full state of one user's session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: UserIdentity,
    pub wardrobe: Vec<ClothingItem>,
    pub saved_outfits: Vec<SavedOutfit>,
    pub generated_outfits: Vec<GeneratedOutfit>,
    pub revision_id: i64,
}

/// Outcome of a batch image upload. `failed` counts images that were not persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsReport {
    pub added: Vec<ClothingItem>,
    pub failed: usize,
}

/// Outcome of rendering every proposed outfit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderAllReport {
    pub rendered: usize,
    pub failed: usize,
}

/// Result of linking items into a set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAssignment {
    pub set_id: String,
    pub item_ids: Vec<String>,
}

/// Items of one category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category: ClothingCategory,
    pub count: usize,
    pub items: Vec<ClothingItem>,
}

/// Wardrobe partitioned by category, optionally narrowed by a filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeView {
    pub total: usize,
    pub categories: Vec<CategoryGroup>,
    /// Distinct colors of the filtered category (empty without a category)
    pub available_colors: Vec<String>,
    pub available_materials: Vec<String>,
    pub sets: Vec<SetAssignment>,
}
