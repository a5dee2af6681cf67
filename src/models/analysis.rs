//! Wardrobe gap analysis model.

use serde::{Deserialize, Serialize};

/// A single suggestion for the most useful missing piece(s).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeAnalysis {
    pub suggestion: String,
    pub reasoning: String,
    /// Set when the analyzer failed and this is a stand-in message
    #[serde(default)]
    pub is_placeholder: bool,
}

impl WardrobeAnalysis {
    pub fn placeholder() -> Self {
        Self {
            suggestion: "Analysis unavailable".to_string(),
            reasoning: "Something went wrong while analysing your wardrobe. Please try again."
                .to_string(),
            is_placeholder: true,
        }
    }
}
