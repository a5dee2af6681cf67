//! Response schemas sent to Gemini and strict parsing of what comes back.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

use super::CollaboratorError;
use crate::models::{
    ClassifiedItem, ClothingCategory, OutfitProposal, RenderedImage, WardrobeAnalysis,
};

// ==================== REQUEST SCHEMAS ====================

pub fn classification_schema() -> Value {
    let categories: Vec<&str> = ClothingCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {
                "type": "STRING",
                "description": "A short descriptive name for the item (e.g. \"Blue denim jacket\")."
            },
            "category": {
                "type": "STRING",
                "enum": categories,
                "description": "The category of the item."
            },
            "color": { "type": "STRING", "description": "The dominant color of the item." },
            "style": {
                "type": "STRING",
                "description": "The style of the item (e.g. Casual, Formal, Sporty, Rock)."
            },
            "material": {
                "type": "STRING",
                "description": "The main material (e.g. Cotton, Denim, Leather, Wool)."
            }
        },
        "required": ["name", "category", "color", "style", "material"]
    })
}

pub fn proposals_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": {
                    "type": "STRING",
                    "description": "A creative, catchy name for the outfit."
                },
                "description": {
                    "type": "STRING",
                    "description": "A short description of why the outfit suits the weather and occasion."
                },
                "item_ids": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "The ids of the wardrobe items that make up the outfit."
                }
            },
            "required": ["name", "description", "item_ids"]
        }
    })
}

pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestion": {
                "type": "STRING",
                "description": "A very short suggestion naming one or two missing key items."
            },
            "reasoning": {
                "type": "STRING",
                "description": "One sentence explaining how these items would improve the wardrobe."
            }
        },
        "required": ["suggestion", "reasoning"]
    })
}

// ==================== RESPONSE ENVELOPE ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Result<String, CollaboratorError> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            let finish_reason = self.candidates.first().and_then(|c| c.finish_reason.as_deref());
            tracing::debug!("Empty text response (finish reason: {:?})", finish_reason);
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(text)
    }

    /// First inline image of the first candidate.
    pub fn image(&self) -> Result<RenderedImage, CollaboratorError> {
        let inline = self
            .parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| d.mime_type.starts_with("image/"))
            .ok_or(CollaboratorError::EmptyResponse)?;

        STANDARD.decode(inline.data.trim()).map_err(|e| {
            CollaboratorError::InvalidResponse(format!("image payload is not base64: {}", e))
        })?;

        Ok(RenderedImage {
            mime_type: inline.mime_type.clone(),
            data: inline.data.trim().to_string(),
        })
    }
}

// ==================== PAYLOAD PARSING ====================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassification {
    name: String,
    category: String,
    color: String,
    style: String,
    material: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProposal {
    name: String,
    description: String,
    item_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAnalysis {
    suggestion: String,
    reasoning: String,
}

/// Tolerate a markdown code fence around the JSON body.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn from_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, CollaboratorError> {
    serde_json::from_str(strip_fences(text))
        .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
}

fn required(field: &str, value: String) -> Result<String, CollaboratorError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(CollaboratorError::InvalidResponse(format!(
            "field '{}' is empty",
            field
        )));
    }
    Ok(value)
}

pub fn parse_classification(text: &str) -> Result<ClassifiedItem, CollaboratorError> {
    let raw: RawClassification = from_json(text)?;

    let category = match ClothingCategory::from_str(&raw.category) {
        Some(category) => category,
        None => {
            tracing::warn!(
                "Classifier returned unknown category '{}', defaulting to Accessory",
                raw.category
            );
            ClothingCategory::Accessory
        }
    };

    Ok(ClassifiedItem {
        name: required("name", raw.name)?,
        category,
        color: raw.color.trim().to_string(),
        style: raw.style.trim().to_string(),
        material: raw.material.trim().to_string(),
    })
}

pub fn parse_proposals(text: &str) -> Result<Vec<OutfitProposal>, CollaboratorError> {
    let raw: Vec<RawProposal> = from_json(text)?;
    raw.into_iter()
        .map(|p| {
            Ok(OutfitProposal {
                name: required("name", p.name)?,
                description: p.description.trim().to_string(),
                item_ids: p.item_ids.into_iter().map(|id| id.trim().to_string()).collect(),
            })
        })
        .collect()
}

pub fn parse_analysis(text: &str) -> Result<WardrobeAnalysis, CollaboratorError> {
    let raw: RawAnalysis = from_json(text)?;
    Ok(WardrobeAnalysis {
        suggestion: required("suggestion", raw.suggestion)?,
        reasoning: raw.reasoning.trim().to_string(),
        is_placeholder: false,
    })
}
