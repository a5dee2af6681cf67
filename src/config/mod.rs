//! Configuration module for the wardrobe backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// One entry of the static identity table (`token=uid[:label]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: String,
    pub uid: String,
    /// Display name, or email when it contains `@`
    pub label: Option<String>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Static bearer tokens mapped to user identities
    pub api_tokens: Vec<TokenEntry>,
    /// Base URL of an external identity provider (takes precedence over `api_tokens`)
    pub identity_url: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding uploaded clothing images
    pub image_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Gemini API key; collaborators are disabled without it
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Model used for classification, composition and gap analysis
    pub analysis_model: String,
    /// Model used to render outfit images
    pub image_model: String,
    pub ai_timeout: Duration,
    /// Maximum request body size, uploads included
    pub max_upload_bytes: usize,
    /// Cached sessions unused for this long are dropped
    pub session_idle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_tokens = env::var("WARDROBE_API_TOKENS")
            .map(|raw| parse_token_table(&raw))
            .unwrap_or_default();

        let identity_url = env::var("WARDROBE_IDENTITY_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let db_path = env::var("WARDROBE_DB_PATH")
            .unwrap_or_else(|_| "./data/wardrobe.sqlite".to_string())
            .into();

        let image_dir = env::var("WARDROBE_IMAGE_DIR")
            .unwrap_or_else(|_| "./data/images".to_string())
            .into();

        let bind_addr = env::var("WARDROBE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid WARDROBE_BIND_ADDR format");

        let log_level = env::var("WARDROBE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let gemini_api_key = env::var("WARDROBE_GEMINI_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let gemini_base_url = env::var("WARDROBE_GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let analysis_model =
            env::var("WARDROBE_ANALYSIS_MODEL").unwrap_or_else(|_| "gemini-2.5-pro".to_string());

        let image_model = env::var("WARDROBE_IMAGE_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string());

        let ai_timeout = env::var("WARDROBE_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(90));

        let max_upload_bytes = env::var("WARDROBE_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024);

        let session_idle_timeout = env::var("WARDROBE_SESSION_IDLE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60 * 60));

        Self {
            api_tokens,
            identity_url,
            db_path,
            image_dir,
            bind_addr,
            log_level,
            gemini_api_key,
            gemini_base_url,
            analysis_model,
            image_model,
            ai_timeout,
            max_upload_bytes,
            session_idle_timeout,
        }
    }
}

/// Parse `token=uid[:label],...`. Malformed entries are skipped.
pub fn parse_token_table(raw: &str) -> Vec<TokenEntry> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, rest) = entry.trim().split_once('=')?;
            let (uid, label) = match rest.split_once(':') {
                Some((uid, label)) => (uid, Some(label.trim().to_string())),
                None => (rest, None),
            };
            if token.trim().is_empty() || uid.trim().is_empty() {
                return None;
            }
            Some(TokenEntry {
                token: token.trim().to_string(),
                uid: uid.trim().to_string(),
                label: label.filter(|l| !l.is_empty()),
            })
        })
        .collect()
}
