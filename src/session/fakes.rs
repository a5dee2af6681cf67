//! In-memory stores and scripted collaborators for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use super::Backends;
use crate::ai::{
    CollaboratorError, ComposerItem, GapAnalyzer, OutfitComposer, OutfitRenderer, RenderItem,
    VisionClassifier,
};
use crate::models::{
    ClassifiedItem, ClothingCategory, ClothingItem, ImageUpload, NewSavedOutfit, Occasion,
    OutfitProposal, RenderedImage, SavedOutfit, WardrobeAnalysis, Weather,
};
use crate::store::{ImageStore, ItemStore, OutfitStore, StoreError};

pub const USER: &str = "user-1";

pub fn item(id: &str, category: ClothingCategory, set_id: Option<&str>) -> ClothingItem {
    ClothingItem {
        id: id.to_string(),
        user_id: USER.to_string(),
        name: format!("Item {}", id),
        category,
        color: "Black".to_string(),
        style: "Casual".to_string(),
        material: "Cotton".to_string(),
        image: format!("/images/clothes/{}/{}.png", USER, id),
        set_id: set_id.map(str::to_string),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// Upload whose bytes tell the fake classifier what to return: `category:name`.
/// Bytes starting with `bad` make classification fail.
pub fn upload(descriptor: &str) -> ImageUpload {
    ImageUpload {
        mime_type: "image/png".to_string(),
        bytes: descriptor.as_bytes().to_vec(),
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("injected {} failure", what),
    ))
}

/// Blocks callers until released, so tests can observe in-flight states.
pub struct Gate {
    enabled: bool,
    permits: Semaphore,
    started: Notify,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            enabled: false,
            permits: Semaphore::new(0),
            started: Notify::new(),
        }
    }
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            enabled: true,
            permits: Semaphore::new(0),
            started: Notify::new(),
        }
    }

    async fn pass(&self) {
        if self.enabled {
            self.started.notify_one();
            self.permits.acquire().await.unwrap().forget();
        }
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

#[derive(Default)]
pub struct MemoryItemStore {
    pub items: Mutex<Vec<ClothingItem>>,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_update: AtomicBool,
    pub update_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MemoryItemStore {
    pub fn get(&self, id: &str) -> Option<ClothingItem> {
        self.items.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list(&self, user_id: &str) -> Result<Vec<ClothingItem>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        user_id: &str,
        fields: &ClassifiedItem,
        image_ref: &str,
    ) -> Result<ClothingItem, StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected("create"));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let item = ClothingItem {
            id: format!("new-{}", n),
            user_id: user_id.to_string(),
            name: fields.name.clone(),
            category: fields.category,
            color: fields.color.clone(),
            style: fields.style.clone(),
            material: fields.material.clone(),
            image: image_ref.to_string(),
            set_id: None,
            created_at: "2024-01-02T00:00:00Z".to_string(),
        };
        self.items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn delete(&self, user_id: &str, item_id: &str) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| !(i.id == item_id && i.user_id == user_id));
        if items.len() == before {
            return Err(StoreError::NotFound(item_id.to_string()));
        }
        Ok(())
    }

    async fn update_set_id(
        &self,
        user_id: &str,
        item_ids: &[String],
        set_id: Option<&str>,
    ) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }
        let mut items = self.items.lock().unwrap();
        for id in item_ids {
            if !items.iter().any(|i| &i.id == id && i.user_id == user_id) {
                return Err(StoreError::NotFound(id.clone()));
            }
        }
        for item in items.iter_mut().filter(|i| item_ids.contains(&i.id)) {
            item.set_id = set_id.map(str::to_string);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryImageStore {
    pub images: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_delete: AtomicBool,
    next_id: AtomicUsize,
}

impl MemoryImageStore {
    pub fn contains(&self, image_ref: &str) -> bool {
        self.images.lock().unwrap().contains_key(image_ref)
    }

    pub fn count(&self) -> usize {
        self.images.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(
        &self,
        user_id: &str,
        name_hint: &str,
        image: &ImageUpload,
    ) -> Result<String, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut images = self.images.lock().unwrap();
        let image_ref = format!(
            "/images/clothes/{}/{}-{}.{}",
            user_id,
            n,
            name_hint.replace(' ', "-"),
            image.extension()
        );
        images.insert(image_ref.clone(), image.bytes.clone());
        Ok(image_ref)
    }

    async fn delete(&self, image_ref: &str) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("image delete"));
        }
        match self.images.lock().unwrap().remove(image_ref) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(image_ref.to_string())),
        }
    }
}

#[derive(Default)]
pub struct MemoryOutfitStore {
    pub outfits: Mutex<Vec<SavedOutfit>>,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub create_calls: AtomicUsize,
}

impl MemoryOutfitStore {
    pub fn count(&self) -> usize {
        self.outfits.lock().unwrap().len()
    }
}

#[async_trait]
impl OutfitStore for MemoryOutfitStore {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedOutfit>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        Ok(self
            .outfits
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        user_id: &str,
        outfit: &NewSavedOutfit,
    ) -> Result<SavedOutfit, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected("create"));
        }
        let mut outfits = self.outfits.lock().unwrap();
        let saved = SavedOutfit {
            id: format!("saved-{}", outfits.len()),
            user_id: user_id.to_string(),
            name: outfit.name.clone(),
            description: outfit.description.clone(),
            item_ids: outfit.item_ids.clone(),
            item_images: outfit.item_images.clone(),
            fingerprint: outfit.fingerprint.clone(),
            created_at: "2024-01-03T00:00:00Z".to_string(),
        };
        outfits.push(saved.clone());
        Ok(saved)
    }

    async fn delete(&self, user_id: &str, outfit_id: &str) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        let mut outfits = self.outfits.lock().unwrap();
        let before = outfits.len();
        outfits.retain(|o| !(o.id == outfit_id && o.user_id == user_id));
        if outfits.len() == before {
            return Err(StoreError::NotFound(outfit_id.to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeClassifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl VisionClassifier for FakeClassifier {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifiedItem, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = String::from_utf8_lossy(&image.bytes);
        if text.starts_with("bad") {
            return Err(CollaboratorError::InvalidResponse("unreadable image".to_string()));
        }
        let (category, name) = text.split_once(':').unwrap_or(("accessory", &text[..]));
        Ok(ClassifiedItem {
            name: name.to_string(),
            category: ClothingCategory::coerce(category),
            color: "Black".to_string(),
            style: "Casual".to_string(),
            material: "Cotton".to_string(),
        })
    }
}

/// Returns scripted proposals. Without a script, proposes a single outfit of every item.
#[derive(Default)]
pub struct FakeComposer {
    pub script: Mutex<Option<Vec<OutfitProposal>>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Vec<ComposerItem>>,
    pub gate: Gate,
}

impl FakeComposer {
    pub fn script(&self, proposals: Vec<OutfitProposal>) {
        *self.script.lock().unwrap() = Some(proposals);
    }
}

#[async_trait]
impl OutfitComposer for FakeComposer {
    async fn compose(
        &self,
        wardrobe: &[ComposerItem],
        _weather: &Weather,
        _occasion: Occasion,
    ) -> Result<Vec<OutfitProposal>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = wardrobe.to_vec();
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::EmptyResponse);
        }
        if let Some(script) = self.script.lock().unwrap().clone() {
            return Ok(script);
        }
        Ok(vec![OutfitProposal {
            name: "Everything".to_string(),
            description: "All of it".to_string(),
            item_ids: wardrobe.iter().map(|i| i.id.clone()).collect(),
        }])
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub gate: Gate,
}

#[async_trait]
impl OutfitRenderer for FakeRenderer {
    async fn render(&self, items: &[RenderItem]) -> Result<RenderedImage, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Api {
                status: 500,
                message: "render backend down".to_string(),
            });
        }
        Ok(RenderedImage {
            mime_type: "image/png".to_string(),
            data: format!("cmVuZGVy{}", items.len()),
        })
    }
}

#[derive(Default)]
pub struct FakeAnalyst {
    pub fail: AtomicBool,
}

#[async_trait]
impl GapAnalyzer for FakeAnalyst {
    async fn analyze(
        &self,
        wardrobe: &[ComposerItem],
    ) -> Result<WardrobeAnalysis, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(WardrobeAnalysis {
            suggestion: "A camel coat".to_string(),
            reasoning: format!("{} items and no outerwear", wardrobe.len()),
            is_placeholder: false,
        })
    }
}

/// Every fake wired together, with handles kept for assertions.
#[derive(Default)]
pub struct Fakes {
    pub items: Arc<MemoryItemStore>,
    pub images: Arc<MemoryImageStore>,
    pub outfits: Arc<MemoryOutfitStore>,
    pub classifier: Arc<FakeClassifier>,
    pub composer: Arc<FakeComposer>,
    pub renderer: Arc<FakeRenderer>,
    pub analyst: Arc<FakeAnalyst>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gated_renderer() -> Self {
        Self {
            renderer: Arc::new(FakeRenderer {
                gate: Gate::closed(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_gated_composer() -> Self {
        Self {
            composer: Arc::new(FakeComposer {
                gate: Gate::closed(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Seed stored items, registering each item's image.
    pub fn seed(&self, items: Vec<ClothingItem>) {
        let mut images = self.images.images.lock().unwrap();
        for item in &items {
            images.insert(item.image.clone(), b"img".to_vec());
        }
        self.items.items.lock().unwrap().extend(items);
    }

    pub fn backends(&self) -> Backends {
        Backends {
            items: self.items.clone(),
            images: self.images.clone(),
            outfits: self.outfits.clone(),
            classifier: self.classifier.clone(),
            composer: self.composer.clone(),
            renderer: self.renderer.clone(),
            analyst: self.analyst.clone(),
        }
    }
}
