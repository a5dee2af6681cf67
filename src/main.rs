//! Wardrobe Backend
//!
//! REST backend for a personal wardrobe: AI-classified clothing items, sets, generated
//! outfits with rendered previews and saved looks, persisted in SQLite.

mod ai;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod session;
mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai::{GeminiClient, GeminiConfig};
use auth::{HttpIdentityGateway, IdentityGateway, StaticTokenGateway};
use config::Config;
use db::Repository;
use session::{Backends, SessionRegistry};
use store::FsImageStore;

/// URL prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/images";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub identity: Option<Arc<dyn IdentityGateway>>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wardrobe Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Image directory: {:?}", config.image_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    let identity = identity_gateway(&config);

    // Initialize stores
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));
    let images = Arc::new(FsImageStore::open(&config.image_dir, IMAGE_URL_PREFIX).await?);

    // AI collaborators
    let gemini = Arc::new(GeminiClient::new(GeminiConfig::from(&config))?);
    if !gemini.is_configured() {
        tracing::warn!(
            "No Gemini API key configured (WARDROBE_GEMINI_API_KEY). Classification, outfit generation and analysis will fail!"
        );
    }

    let backends = Backends {
        items: repo.clone(),
        images,
        outfits: repo,
        classifier: gemini.clone(),
        composer: gemini.clone(),
        renderer: gemini.clone(),
        analyst: gemini,
    };

    let state = AppState {
        sessions: Arc::new(SessionRegistry::new(backends)),
        identity,
        config: Arc::new(config.clone()),
    };

    // Periodic idle session sweep (every minute)
    let sessions = state.sessions.clone();
    let idle_timeout = config.session_idle_timeout;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.evict_idle(idle_timeout).await;
        }
    });

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the identity gateway: remote provider, static tokens, or none.
fn identity_gateway(config: &Config) -> Option<Arc<dyn IdentityGateway>> {
    if let Some(url) = &config.identity_url {
        tracing::info!("Using identity provider at {}", url);
        return Some(Arc::new(HttpIdentityGateway::new(url)));
    }
    if !config.api_tokens.is_empty() {
        tracing::info!("Using {} configured API tokens", config.api_tokens.len());
        return Some(Arc::new(StaticTokenGateway::new(&config.api_tokens)));
    }
    tracing::warn!(
        "No identity provider or API tokens configured (WARDROBE_IDENTITY_URL / WARDROBE_API_TOKENS). Authentication is disabled!"
    );
    None
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let identity = state.identity.clone();
    let body_limit = state.config.max_upload_bytes;
    let image_dir = state.config.image_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Session
        .route("/session", get(api::get_session))
        .route("/session", delete(api::end_session))
        .route("/session/reload", post(api::reload_session))
        // Wardrobe
        .route("/wardrobe", get(api::get_wardrobe))
        .route("/wardrobe/items", post(api::add_items))
        .route("/wardrobe/items/{id}", delete(api::delete_item))
        .route("/wardrobe/sets", post(api::create_set))
        .route("/wardrobe/sets/{set_id}", delete(api::break_set))
        .route("/wardrobe/analysis", post(api::analyze_wardrobe))
        // Outfits
        .route("/outfits/generate", post(api::generate_outfits))
        .route("/outfits/generated", get(api::list_generated))
        .route("/outfits/generated/render", post(api::render_all))
        .route("/outfits/generated/{id}/render", post(api::render_outfit))
        .route("/outfits/generated/{id}/save", post(api::save_outfit))
        .route("/outfits/saved", get(api::list_saved))
        .route("/outfits/saved/{id}", delete(api::unsave_outfit))
        // Apply identity middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::identity_layer(identity.clone(), req, next)
        }))
        .layer(DefaultBodyLimit::max(body_limit));

    // Health check and stored images (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .nest_service(IMAGE_URL_PREFIX, ServeDir::new(image_dir));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
