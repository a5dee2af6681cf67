//! Request bodies accepted by the REST API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use super::{ImageUpload, Occasion, Weather};

/// One uploaded image, base64 encoded or as a `data:` URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadRequest {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

impl ImageUploadRequest {
    /// Decode into raw bytes. The MIME type of a data URL wins over `mimeType`.
    pub fn decode(&self) -> Result<ImageUpload, String> {
        let (url_mime, payload) = match self.data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| "Malformed data URL".to_string())?;
                let mime = header
                    .strip_suffix(";base64")
                    .ok_or_else(|| "Data URL must be base64 encoded".to_string())?;
                (Some(mime.to_string()), payload)
            }
            None => (None, self.data.as_str()),
        };

        let mime_type = url_mime
            .or_else(|| self.mime_type.clone())
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !mime_type.starts_with("image/") {
            return Err(format!("Unsupported image type '{}'", mime_type));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("Invalid base64 image data: {}", e))?;
        if bytes.is_empty() {
            return Err("Image data is empty".to_string());
        }

        Ok(ImageUpload { mime_type, bytes })
    }
}

/// Request body for adding clothing items from photos.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsRequest {
    pub images: Vec<ImageUploadRequest>,
}

/// Request body for linking items into a set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetRequest {
    pub item_ids: Vec<String>,
}

/// Request body for outfit generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutfitsRequest {
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub occasion: Occasion,
}
