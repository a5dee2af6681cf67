//! Gemini `generateContent` client implementing every collaborator trait.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};

use super::prompt::{analysis_prompt, compose_prompt, render_prompt, CLASSIFY_PROMPT};
use super::schema::{
    analysis_schema, classification_schema, parse_analysis, parse_classification,
    parse_proposals, proposals_schema, GenerateContentResponse,
};
use super::{
    CollaboratorError, ComposerItem, GapAnalyzer, OutfitComposer, OutfitRenderer, RenderItem,
    VisionClassifier,
};
use crate::config::Config;
use crate::models::{
    ClassifiedItem, ImageUpload, Occasion, OutfitProposal, RenderedImage, WardrobeAnalysis,
    Weather,
};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub analysis_model: String,
    pub image_model: String,
    pub timeout: Duration,
}

impl From<&Config> for GeminiConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            analysis_model: config.analysis_model.clone(),
            image_model: config.image_model.clone(),
            timeout: config.ai_timeout,
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, CollaboratorError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(
        &self,
        model: &str,
        body: Value,
    ) -> Result<GenerateContentResponse, CollaboratorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured)?;

        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        tracing::debug!("Calling Gemini model {}", model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            tracing::error!("Gemini returned {}: {}", status, message);
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }

    /// JSON-constrained text generation.
    async fn generate_json(
        &self,
        parts: Vec<Value>,
        schema: Value,
    ) -> Result<String, CollaboratorError> {
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });
        self.generate(&self.config.analysis_model, body)
            .await?
            .text()
    }
}

fn invalid_prompt(e: serde_json::Error) -> CollaboratorError {
    CollaboratorError::InvalidResponse(format!("failed to encode wardrobe: {}", e))
}

#[async_trait]
impl VisionClassifier for GeminiClient {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifiedItem, CollaboratorError> {
        let parts = vec![
            json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": STANDARD.encode(&image.bytes),
                }
            }),
            json!({ "text": CLASSIFY_PROMPT }),
        ];
        let text = self.generate_json(parts, classification_schema()).await?;
        parse_classification(&text)
    }
}

#[async_trait]
impl OutfitComposer for GeminiClient {
    async fn compose(
        &self,
        wardrobe: &[ComposerItem],
        weather: &Weather,
        occasion: Occasion,
    ) -> Result<Vec<OutfitProposal>, CollaboratorError> {
        let prompt = compose_prompt(wardrobe, weather, occasion).map_err(invalid_prompt)?;
        let text = self
            .generate_json(vec![json!({ "text": prompt })], proposals_schema())
            .await?;
        parse_proposals(&text)
    }
}

#[async_trait]
impl OutfitRenderer for GeminiClient {
    async fn render(&self, items: &[RenderItem]) -> Result<RenderedImage, CollaboratorError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": render_prompt(items) }] }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });
        self.generate(&self.config.image_model, body).await?.image()
    }
}

#[async_trait]
impl GapAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        wardrobe: &[ComposerItem],
    ) -> Result<WardrobeAnalysis, CollaboratorError> {
        let prompt = analysis_prompt(wardrobe).map_err(invalid_prompt)?;
        let text = self
            .generate_json(vec![json!({ "text": prompt })], analysis_schema())
            .await?;
        parse_analysis(&text)
    }
}
