//! Clothing item model.

use serde::{Deserialize, Serialize};

/// Clothing category. Declaration order is the display order of the wardrobe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClothingCategory {
    Top,
    Bottom,
    Footwear,
    Accessory,
}

impl ClothingCategory {
    pub const ALL: [ClothingCategory; 4] = [
        ClothingCategory::Top,
        ClothingCategory::Bottom,
        ClothingCategory::Footwear,
        ClothingCategory::Accessory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClothingCategory::Top => "Top",
            ClothingCategory::Bottom => "Bottom",
            ClothingCategory::Footwear => "Footwear",
            ClothingCategory::Accessory => "Accessory",
        }
    }

    /// Case-insensitive parse which also accepts common plural and synonym forms.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" | "tops" | "shirt" | "shirts" | "outerwear" => Some(ClothingCategory::Top),
            "bottom" | "bottoms" | "pants" | "trousers" | "skirt" | "skirts" => {
                Some(ClothingCategory::Bottom)
            }
            "footwear" | "shoe" | "shoes" => Some(ClothingCategory::Footwear),
            "accessory" | "accessories" | "jewelry" | "jewellery" => {
                Some(ClothingCategory::Accessory)
            }
            _ => None,
        }
    }

    /// Parse, falling back to `Accessory` for anything unrecognised.
    pub fn coerce(s: &str) -> Self {
        Self::from_str(s).unwrap_or(ClothingCategory::Accessory)
    }
}

/// A clothing item owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: ClothingCategory,
    pub color: String,
    pub style: String,
    pub material: String,
    /// Public URL of the stored image
    pub image: String,
    /// Items sharing a set id always appear together in an outfit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    pub created_at: String,
}

/// Fields produced by the vision classifier for one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedItem {
    pub name: String,
    pub category: ClothingCategory,
    pub color: String,
    pub style: String,
    pub material: String,
}

/// Decoded image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// File extension derived from the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            _ => "jpg",
        }
    }
}

/// Filter applied within a single category of the wardrobe.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilter {
    #[serde(default)]
    pub category: Option<ClothingCategory>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}
