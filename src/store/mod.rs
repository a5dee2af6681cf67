//! Persistence seams consumed by the wardrobe session.
//!
//! The item and outfit stores are implemented by the SQLite [`Repository`](crate::db::Repository);
//! images live in a separate binary store.

mod images;

pub use images::FsImageStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ClassifiedItem, ClothingItem, ImageUpload, NewSavedOutfit, SavedOutfit};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Clothing item records.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<ClothingItem>, StoreError>;

    async fn create(
        &self,
        user_id: &str,
        fields: &ClassifiedItem,
        image_ref: &str,
    ) -> Result<ClothingItem, StoreError>;

    async fn delete(&self, user_id: &str, item_id: &str) -> Result<(), StoreError>;

    /// Set or clear the set id of every listed item. All-or-nothing.
    async fn update_set_id(
        &self,
        user_id: &str,
        item_ids: &[String],
        set_id: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Binary store for item images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the image and return its reference.
    async fn put(
        &self,
        user_id: &str,
        name_hint: &str,
        image: &ImageUpload,
    ) -> Result<String, StoreError>;

    /// Returns `StoreError::NotFound` when the image is already gone.
    async fn delete(&self, image_ref: &str) -> Result<(), StoreError>;
}

/// Saved outfit records.
#[async_trait]
pub trait OutfitStore: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedOutfit>, StoreError>;

    async fn create(
        &self,
        user_id: &str,
        outfit: &NewSavedOutfit,
    ) -> Result<SavedOutfit, StoreError>;

    async fn delete(&self, user_id: &str, outfit_id: &str) -> Result<(), StoreError>;
}
