//! Generated and saved outfit models.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ClothingItem;

/// Rendered composite image, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderedImage {
    pub mime_type: String,
    pub data: String,
}

/// Render lifecycle of a generated outfit.
///
/// `Proposed -> Rendering -> Rendered`, or back to `Proposed` when rendering fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "state", content = "image")]
pub enum RenderState {
    Proposed,
    Rendering,
    Rendered(RenderedImage),
}

/// A composer proposal after validation, held only in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOutfit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    /// Members in proposal order, without duplicates
    pub items: Vec<ClothingItem>,
    pub fingerprint: String,
    pub render: RenderState,
    pub is_saved: bool,
}

impl GeneratedOutfit {
    pub fn is_rendering(&self) -> bool {
        matches!(self.render, RenderState::Rendering)
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }
}

/// A persisted outfit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedOutfit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub item_ids: Vec<String>,
    /// Denormalized item image URLs for display without refetching items
    pub item_images: Vec<String>,
    pub fingerprint: String,
    pub created_at: String,
}

impl SavedOutfit {
    /// Whether a generated outfit with this name and fingerprint is already saved.
    pub fn matches(&self, name: &str, fingerprint: &str) -> bool {
        self.name == name || self.fingerprint == fingerprint
    }
}

/// Fields for persisting a new saved outfit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSavedOutfit {
    pub name: String,
    pub description: String,
    pub item_ids: Vec<String>,
    pub item_images: Vec<String>,
    pub fingerprint: String,
}

impl From<&GeneratedOutfit> for NewSavedOutfit {
    fn from(outfit: &GeneratedOutfit) -> Self {
        Self {
            name: outfit.name.clone(),
            description: outfit.description.clone(),
            item_ids: outfit.item_ids(),
            item_images: outfit.items.iter().map(|i| i.image.clone()).collect(),
            fingerprint: outfit.fingerprint.clone(),
        }
    }
}

/// Raw proposal returned by the outfit composer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutfitProposal {
    pub name: String,
    pub description: String,
    pub item_ids: Vec<String>,
}

/// SHA-256 over the sorted, de-duplicated member ids.
pub fn outfit_fingerprint<S: AsRef<str>>(item_ids: &[S]) -> String {
    let mut ids: Vec<&str> = item_ids.iter().map(|s| s.as_ref()).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
