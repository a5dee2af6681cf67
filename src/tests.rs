//! Integration tests for the wardrobe backend.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::{IdentityGateway, StaticTokenGateway};
use crate::config::{Config, TokenEntry};
use crate::db::{init_database, Repository};
use crate::session::fakes::{FakeAnalyst, FakeClassifier, FakeComposer, FakeRenderer};
use crate::session::{Backends, SessionRegistry};
use crate::store::FsImageStore;
use crate::{create_router, AppState, IMAGE_URL_PREFIX};

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    composer: Arc<FakeComposer>,
    renderer: Arc<FakeRenderer>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let image_dir = temp_dir.path().join("images");

        // Initialize stores
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let images = Arc::new(
            FsImageStore::open(&image_dir, IMAGE_URL_PREFIX)
                .await
                .expect("Failed to open image store"),
        );

        let composer = Arc::new(FakeComposer::default());
        let renderer = Arc::new(FakeRenderer::default());
        let backends = Backends {
            items: repo.clone(),
            images,
            outfits: repo,
            classifier: Arc::new(FakeClassifier::default()),
            composer: composer.clone(),
            renderer: renderer.clone(),
            analyst: Arc::new(FakeAnalyst::default()),
        };

        let api_tokens = vec![
            TokenEntry {
                token: ALICE.to_string(),
                uid: "alice".to_string(),
                label: Some("alice@example.com".to_string()),
            },
            TokenEntry {
                token: BOB.to_string(),
                uid: "bob".to_string(),
                label: Some("Bob".to_string()),
            },
        ];
        let identity: Arc<dyn IdentityGateway> = Arc::new(StaticTokenGateway::new(&api_tokens));

        // Create config
        let config = Config {
            api_tokens,
            identity_url: None,
            db_path,
            image_dir,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            gemini_api_key: None,
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            analysis_model: "test-model".to_string(),
            image_model: "test-image-model".to_string(),
            ai_timeout: Duration::from_secs(5),
            max_upload_bytes: 1024 * 1024,
            session_idle_timeout: Duration::from_secs(3600),
        };

        let state = AppState {
            sessions: Arc::new(SessionRegistry::new(backends)),
            identity: Some(identity),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            composer,
            renderer,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .header("x-api-key", token)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .header("x-api-key", token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn delete(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .header("x-api-key", token)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    /// Upload one image per `category:name` descriptor and return the created items.
    async fn upload(&self, token: &str, descriptors: &[&str]) -> Vec<Value> {
        let images: Vec<Value> = descriptors
            .iter()
            .map(|d| json!({ "mimeType": "image/png", "data": STANDARD.encode(d) }))
            .collect();
        let (status, body) = self
            .post(token, "/api/wardrobe/items", json!({ "images": images }))
            .await;
        assert_eq!(status, 200, "upload failed: {}", body);
        body["data"]["added"].as_array().unwrap().clone()
    }
}

fn generate_body() -> Value {
    json!({
        "weather": { "condition": "Rainy", "temperatureC": 9.5 },
        "occasion": "Casual"
    })
}

// ============================================================================
// Health and auth
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/session"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_token() {
    let fixture = TestFixture::new().await;
    let (status, _) = fixture.get("wrong-token", "/api/session").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_auth_bearer_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/session"))
        .bearer_auth(BOB)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["uid"], "bob");
    assert_eq!(body["data"]["user"]["displayName"], "Bob");
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_new_session_is_empty() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get(ALICE, "/api/session").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["revisionId"], 0);
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["wardrobe"], json!([]));
    assert_eq!(body["data"]["savedOutfits"], json!([]));
    assert_eq!(body["data"]["generatedOutfits"], json!([]));
}

#[tokio::test]
async fn test_end_session() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.delete(ALICE, "/api/session").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["wasLoaded"], false);

    fixture.get(ALICE, "/api/session").await;
    let (_, body) = fixture.delete(ALICE, "/api/session").await;
    assert_eq!(body["data"]["wasLoaded"], true);
}

// ============================================================================
// Wardrobe
// ============================================================================

#[tokio::test]
async fn test_upload_classifies_and_partitions() {
    let fixture = TestFixture::new().await;

    let images = json!([
        { "mimeType": "image/png", "data": STANDARD.encode("top:White Tee") },
        { "data": format!("data:image/jpeg;base64,{}", STANDARD.encode("bottom:Chinos")) },
        { "mimeType": "image/png", "data": STANDARD.encode("bad image") },
    ]);
    let (status, body) = fixture
        .post(ALICE, "/api/wardrobe/items", json!({ "images": images }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["added"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["revisionId"], 1);

    let (status, body) = fixture
        .get(ALICE, "/api/wardrobe?category=Top&color=Black")
        .await;
    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["total"], 2);
    let categories = data["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 4);
    assert_eq!(categories[0]["category"], "Top");
    assert_eq!(categories[0]["count"], 1);
    assert_eq!(categories[1]["count"], 1);
    assert_eq!(data["availableColors"], json!(["Black"]));
}

#[tokio::test]
async fn test_uploaded_image_is_served() {
    let fixture = TestFixture::new().await;
    let added = fixture.upload(ALICE, &["footwear:Boots"]).await;
    let image = added[0]["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("/images/clothes/alice/"));

    let resp = fixture.client.get(fixture.url(&image)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"footwear:Boots");
}

#[tokio::test]
async fn test_upload_rejects_invalid_images() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            ALICE,
            "/api/wardrobe/items",
            json!({ "images": [{ "mimeType": "text/plain", "data": STANDARD.encode("x") }] }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .post(ALICE, "/api/wardrobe/items", json!({ "images": [] }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_users_are_isolated() {
    let fixture = TestFixture::new().await;
    let added = fixture.upload(ALICE, &["top:Shirt", "bottom:Skirt"]).await;

    let (_, body) = fixture.get(BOB, "/api/wardrobe").await;
    assert_eq!(body["data"]["total"], 0);

    let id = added[0]["id"].as_str().unwrap();
    let (status, body) = fixture
        .delete(BOB, &format!("/api/wardrobe/items/{}", id))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_item_removes_image() {
    let fixture = TestFixture::new().await;
    let added = fixture.upload(ALICE, &["top:Shirt"]).await;
    let id = added[0]["id"].as_str().unwrap();
    let image = added[0]["image"].as_str().unwrap();

    let (status, body) = fixture
        .delete(ALICE, &format!("/api/wardrobe/items/{}", id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], id);

    let resp = fixture.client.get(fixture.url(image)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let (_, body) = fixture.get(ALICE, "/api/wardrobe").await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_sets_round_trip_through_store() {
    let fixture = TestFixture::new().await;
    let added = fixture
        .upload(ALICE, &["top:Blazer", "bottom:Trousers", "footwear:Loafers"])
        .await;
    let ids: Vec<&str> = added.iter().map(|i| i["id"].as_str().unwrap()).collect();

    let (status, body) = fixture
        .post(ALICE, "/api/wardrobe/sets", json!({ "itemIds": [ids[0]] }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .post(ALICE, "/api/wardrobe/sets", json!({ "itemIds": [ids[0], ids[1]] }))
        .await;
    assert_eq!(status, 200);
    let set_id = body["data"]["setId"].as_str().unwrap().to_string();

    // Reload from the database: the set survives
    let (status, body) = fixture.post(ALICE, "/api/session/reload", json!({})).await;
    assert_eq!(status, 200);
    let wardrobe = body["data"]["wardrobe"].as_array().unwrap();
    let linked = wardrobe.iter().filter(|i| i["setId"] == set_id).count();
    assert_eq!(linked, 2);

    let (_, body) = fixture.get(ALICE, "/api/wardrobe").await;
    assert_eq!(body["data"]["sets"][0]["setId"], set_id);

    let (status, _) = fixture
        .delete(ALICE, &format!("/api/wardrobe/sets/{}", set_id))
        .await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get(ALICE, "/api/wardrobe").await;
    assert_eq!(body["data"]["sets"], json!([]));

    let (status, _) = fixture
        .delete(ALICE, &format!("/api/wardrobe/sets/{}", set_id))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_analysis() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post(ALICE, "/api/wardrobe/analysis", json!({})).await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_WARDROBE");

    fixture.upload(ALICE, &["top:Shirt"]).await;
    let (status, body) = fixture.post(ALICE, "/api/wardrobe/analysis", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isPlaceholder"], false);
}

// ============================================================================
// Outfits
// ============================================================================

#[tokio::test]
async fn test_generate_requires_three_items() {
    let fixture = TestFixture::new().await;
    fixture.upload(ALICE, &["top:Shirt", "bottom:Jeans"]).await;

    let (status, body) = fixture
        .post(ALICE, "/api/outfits/generate", generate_body())
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_WARDROBE");
    assert_eq!(body["error"]["details"]["required"], 3);
    assert_eq!(body["error"]["details"]["actual"], 2);
    assert_eq!(fixture.composer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generate_rejects_implausible_temperature() {
    let fixture = TestFixture::new().await;
    fixture
        .upload(ALICE, &["top:Shirt", "bottom:Jeans", "footwear:Boots"])
        .await;

    let body = json!({ "weather": { "condition": "Sunny", "temperatureC": 95.0 } });
    let (status, body) = fixture.post(ALICE, "/api/outfits/generate", body).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_composer_failure_is_reported() {
    let fixture = TestFixture::new().await;
    fixture
        .upload(ALICE, &["top:Shirt", "bottom:Jeans", "footwear:Boots"])
        .await;
    fixture.composer.fail.store(true, Ordering::SeqCst);

    let (status, body) = fixture
        .post(ALICE, "/api/outfits/generate", generate_body())
        .await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "COMPOSITION_ERROR");

    let (_, body) = fixture.get(ALICE, "/api/outfits/generated").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_generate_render_save_flow() {
    let fixture = TestFixture::new().await;
    fixture
        .upload(ALICE, &["top:Shirt", "bottom:Jeans", "footwear:Boots"])
        .await;

    let (status, body) = fixture
        .post(ALICE, "/api/outfits/generate", generate_body())
        .await;
    assert_eq!(status, 200);
    let outfits = body["data"].as_array().unwrap();
    assert_eq!(outfits.len(), 1);
    let outfit_id = outfits[0]["id"].as_str().unwrap().to_string();
    assert_eq!(outfits[0]["render"]["state"], "proposed");
    assert_eq!(outfits[0]["isSaved"], false);

    // Render
    let (status, body) = fixture
        .post(ALICE, &format!("/api/outfits/generated/{}/render", outfit_id), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["render"]["state"], "rendered");
    assert_eq!(body["data"]["render"]["image"]["mimeType"], "image/png");

    // Render-all has nothing left to do
    let (_, body) = fixture
        .post(ALICE, "/api/outfits/generated/render", json!({}))
        .await;
    assert_eq!(body["data"], json!({ "rendered": 0, "failed": 0 }));
    assert_eq!(fixture.renderer.calls.load(Ordering::SeqCst), 1);

    // Save twice: one record
    let save_path = format!("/api/outfits/generated/{}/save", outfit_id);
    let (status, first) = fixture.post(ALICE, &save_path, json!({})).await;
    assert_eq!(status, 200);
    let (_, second) = fixture.post(ALICE, &save_path, json!({})).await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(first["data"]["itemImages"].as_array().unwrap().len(), 3);

    // Persisted across reloads
    fixture.post(ALICE, "/api/session/reload", json!({})).await;
    let (_, body) = fixture.get(ALICE, "/api/outfits/saved").await;
    let saved = body["data"].as_array().unwrap();
    assert_eq!(saved.len(), 1);
    let saved_id = saved[0]["id"].as_str().unwrap().to_string();

    // Unsave
    let (status, _) = fixture
        .delete(ALICE, &format!("/api/outfits/saved/{}", saved_id))
        .await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get(ALICE, "/api/outfits/saved").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_render_failure_reports_outfit() {
    let fixture = TestFixture::new().await;
    fixture
        .upload(ALICE, &["top:Shirt", "bottom:Jeans", "footwear:Boots"])
        .await;
    let (_, body) = fixture
        .post(ALICE, "/api/outfits/generate", generate_body())
        .await;
    let outfit_id = body["data"][0]["id"].as_str().unwrap().to_string();

    fixture.renderer.fail.store(true, Ordering::SeqCst);
    let (status, body) = fixture
        .post(ALICE, &format!("/api/outfits/generated/{}/render", outfit_id), json!({}))
        .await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "RENDER_ERROR");
    assert_eq!(body["error"]["details"]["outfitId"], outfit_id);

    let (_, body) = fixture
        .post(ALICE, "/api/outfits/generated/render", json!({}))
        .await;
    assert_eq!(body["data"], json!({ "rendered": 0, "failed": 1 }));
}

#[tokio::test]
async fn test_unknown_outfit() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(ALICE, "/api/outfits/generated/gen-missing/save", json!({}))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = fixture.delete(ALICE, "/api/outfits/saved/nope").await;
    assert_eq!(status, 404);
}
