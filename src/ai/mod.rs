//! External AI collaborators: vision classifier, outfit composer, outfit renderer
//! and gap analyzer.
//!
//! Each collaborator is a trait so the wardrobe session can be driven by the
//! Gemini client in production and by fakes in tests.

mod gemini;
mod prompt;
mod schema;

pub use gemini::{GeminiClient, GeminiConfig};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    ClassifiedItem, ClothingCategory, ClothingItem, ImageUpload, Occasion, OutfitProposal,
    RenderedImage, WardrobeAnalysis, Weather,
};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator is not configured")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("empty response")]
    EmptyResponse,
}

/// Wardrobe item as shown to the composer and analyzer. Image and owner are omitted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComposerItem {
    pub id: String,
    pub name: String,
    pub category: ClothingCategory,
    pub color: String,
    pub style: String,
    pub material: String,
    #[serde(rename = "setId", skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
}

impl From<&ClothingItem> for ComposerItem {
    fn from(item: &ClothingItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category,
            color: item.color.clone(),
            style: item.style.clone(),
            material: item.material.clone(),
            set_id: item.set_id.clone(),
        }
    }
}

/// Item description passed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderItem {
    pub name: String,
    pub color: String,
}

impl From<&ClothingItem> for RenderItem {
    fn from(item: &ClothingItem) -> Self {
        Self {
            name: item.name.clone(),
            color: item.color.clone(),
        }
    }
}

#[async_trait]
pub trait VisionClassifier: Send + Sync {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifiedItem, CollaboratorError>;
}

#[async_trait]
pub trait OutfitComposer: Send + Sync {
    async fn compose(
        &self,
        wardrobe: &[ComposerItem],
        weather: &Weather,
        occasion: Occasion,
    ) -> Result<Vec<OutfitProposal>, CollaboratorError>;
}

#[async_trait]
pub trait OutfitRenderer: Send + Sync {
    async fn render(&self, items: &[RenderItem]) -> Result<RenderedImage, CollaboratorError>;
}

#[async_trait]
pub trait GapAnalyzer: Send + Sync {
    async fn analyze(&self, wardrobe: &[ComposerItem])
        -> Result<WardrobeAnalysis, CollaboratorError>;
}
