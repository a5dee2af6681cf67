//! Per-user wardrobe session.
//!
//! The session owns the in-memory wardrobe, saved outfits and the current batch of
//! generated outfits. Every mutation is confirmed by the backing store before the
//! local state changes, so the snapshot always mirrors the last known good store state.

#[cfg(test)]
pub mod fakes;
mod grouping;
mod registry;
mod snapshot;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::ai::{
    ComposerItem, GapAnalyzer, OutfitComposer, OutfitRenderer, RenderItem, VisionClassifier,
};
use crate::auth::UserIdentity;
use crate::models::{
    outfit_fingerprint, AddItemsReport, ClothingItem, GeneratedOutfit, ImageUpload, ItemFilter,
    NewSavedOutfit, Occasion, RenderAllReport, RenderState, SavedOutfit, SessionSnapshot,
    SetAssignment, WardrobeAnalysis, WardrobeView, Weather,
};
use crate::store::{ImageStore, ItemStore, OutfitStore, StoreError};
use grouping::resolve_items;

pub use grouping::{accept_proposal, Rejection};
pub use registry::SessionRegistry;
pub use snapshot::WardrobeSnapshot;

/// Fewest items the composer is ever asked to work with.
pub const MIN_ITEMS_FOR_OUTFITS: usize = 3;

/// Fewest distinct items that can form a set.
pub const MIN_SET_SIZE: usize = 2;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load session data: {0}")]
    DataLoad(String),

    #[error("wardrobe has {actual} items, {required} required")]
    InsufficientWardrobe { required: usize, actual: usize },

    #[error("outfit composition failed: {0}")]
    Composition(String),

    #[error("render of outfit {outfit_id} failed: {reason}")]
    Render { outfit_id: String, reason: String },

    #[error("{0}")]
    StoreWrite(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("outfit generation already in progress")]
    GenerationInProgress,
}

/// Stores and collaborators a session talks to.
#[derive(Clone)]
pub struct Backends {
    pub items: Arc<dyn ItemStore>,
    pub images: Arc<dyn ImageStore>,
    pub outfits: Arc<dyn OutfitStore>,
    pub classifier: Arc<dyn VisionClassifier>,
    pub composer: Arc<dyn OutfitComposer>,
    pub renderer: Arc<dyn OutfitRenderer>,
    pub analyst: Arc<dyn GapAnalyzer>,
}

#[derive(Debug, Default)]
struct SessionState {
    wardrobe: Vec<ClothingItem>,
    saved: Vec<SavedOutfit>,
    generated: Vec<GeneratedOutfit>,
    /// Bumped on every externally visible change
    revision: i64,
}

impl SessionState {
    fn bump(&mut self) {
        self.revision += 1;
    }

    fn contains_item(&self, item_id: &str) -> bool {
        self.wardrobe.iter().any(|i| i.id == item_id)
    }

    /// Re-resolve generated outfits against the wardrobe, dropping those that name a
    /// removed item or now split a set.
    fn revalidate_generated(&mut self) {
        let SessionState { wardrobe, generated, .. } = self;
        let wardrobe: &[ClothingItem] = wardrobe;
        generated.retain_mut(|outfit| match resolve_items(&outfit.item_ids(), wardrobe) {
            Ok(items) => {
                outfit.items = items;
                true
            }
            Err(rejection) => {
                tracing::debug!("Dropping generated outfit {}: {}", outfit.id, rejection);
                false
            }
        });
    }

    /// Recompute `is_saved` for generated outfits matching `name`/`fingerprint`.
    fn refresh_saved_flags(&mut self, name: &str, fingerprint: &str) -> bool {
        let SessionState { generated, saved, .. } = self;
        let mut changed = false;
        for outfit in generated
            .iter_mut()
            .filter(|o| o.name == name || o.fingerprint == fingerprint)
        {
            let is_saved = saved
                .iter()
                .any(|s| s.matches(&outfit.name, &outfit.fingerprint));
            if outfit.is_saved != is_saved {
                outfit.is_saved = is_saved;
                changed = true;
            }
        }
        changed
    }
}

/// Clears the generation flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct WardrobeSession {
    user: UserIdentity,
    backends: Backends,
    state: RwLock<SessionState>,
    /// Serialises store mutations so confirmations apply in order
    mutations: Mutex<()>,
    generating: AtomicBool,
}

impl WardrobeSession {
    /// Load the user's wardrobe and saved outfits. Both reads must succeed.
    pub async fn load(user: UserIdentity, backends: Backends) -> Result<Self, SessionError> {
        let (wardrobe, saved) = tokio::try_join!(
            backends.items.list(&user.uid),
            backends.outfits.list(&user.uid)
        )
        .map_err(|e| {
            tracing::error!("Failed to load session for {}: {}", user.uid, e);
            SessionError::DataLoad(e.to_string())
        })?;

        tracing::info!(
            "Loaded session for {}: {} items, {} saved outfits",
            user.uid,
            wardrobe.len(),
            saved.len()
        );

        Ok(Self {
            user,
            backends,
            state: RwLock::new(SessionState {
                wardrobe,
                saved,
                ..Default::default()
            }),
            mutations: Mutex::new(()),
            generating: AtomicBool::new(false),
        })
    }

    pub async fn revision(&self) -> i64 {
        self.state.read().await.revision
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            user: self.user.clone(),
            wardrobe: state.wardrobe.clone(),
            saved_outfits: state.saved.clone(),
            generated_outfits: state.generated.clone(),
            revision_id: state.revision,
        }
    }

    pub async fn wardrobe(&self) -> WardrobeSnapshot {
        WardrobeSnapshot::new(self.state.read().await.wardrobe.clone())
    }

    pub async fn wardrobe_view(&self, filter: &ItemFilter) -> WardrobeView {
        self.wardrobe().await.view(filter)
    }

    pub async fn generated_outfits(&self) -> Vec<GeneratedOutfit> {
        self.state.read().await.generated.clone()
    }

    pub async fn saved_outfits(&self) -> Vec<SavedOutfit> {
        self.state.read().await.saved.clone()
    }

    /// Classify and persist each image independently. Failures are counted, not fatal.
    pub async fn add_items(
        &self,
        images: Vec<ImageUpload>,
    ) -> Result<AddItemsReport, SessionError> {
        if images.is_empty() {
            return Err(SessionError::Validation("No images provided".to_string()));
        }

        let _gate = self.mutations.lock().await;
        let total = images.len();
        let results = join_all(
            images
                .iter()
                .enumerate()
                .map(|(index, image)| self.classify_and_store(index, image)),
        )
        .await;

        let added: Vec<ClothingItem> = results.into_iter().flatten().collect();
        let failed = total - added.len();

        if !added.is_empty() {
            let mut state = self.state.write().await;
            state.wardrobe.extend(added.iter().cloned());
            state.bump();
        }

        if failed > 0 {
            tracing::warn!(
                "{} of {} images could not be added for {}",
                failed,
                total,
                self.user.uid
            );
        } else {
            tracing::info!("Added {} items for {}", added.len(), self.user.uid);
        }

        Ok(AddItemsReport { added, failed })
    }

    async fn classify_and_store(&self, index: usize, image: &ImageUpload) -> Option<ClothingItem> {
        let uid = &self.user.uid;

        let fields = match self.backends.classifier.classify(image).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("Classification failed for image {}: {}", index, e);
                return None;
            }
        };

        let image_ref = match self.backends.images.put(uid, &fields.name, image).await {
            Ok(image_ref) => image_ref,
            Err(e) => {
                tracing::error!("Failed to store image {}: {}", index, e);
                return None;
            }
        };

        match self.backends.items.create(uid, &fields, &image_ref).await {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::error!("Failed to create item record for image {}: {}", index, e);
                if let Err(e) = self.backends.images.delete(&image_ref).await {
                    tracing::warn!("Failed to remove orphaned image {}: {}", image_ref, e);
                }
                None
            }
        }
    }

    /// Remove an item's image and record. An already missing image counts as removed.
    pub async fn delete_item(&self, item_id: &str) -> Result<(), SessionError> {
        let _gate = self.mutations.lock().await;

        let image_ref = {
            let state = self.state.read().await;
            state
                .wardrobe
                .iter()
                .find(|i| i.id == item_id)
                .map(|i| i.image.clone())
                .ok_or_else(|| item_not_found(item_id))?
        };

        match self.backends.images.delete(&image_ref).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Image {} was already gone", image_ref);
            }
            Err(e) => return Err(store_write("delete this item", e)),
        }

        match self.backends.items.delete(&self.user.uid, item_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Item record {} was already gone", item_id);
            }
            Err(e) => return Err(store_write("delete this item", e)),
        }

        let mut state = self.state.write().await;
        state.wardrobe.retain(|i| i.id != item_id);
        state.revalidate_generated();
        state.bump();
        tracing::info!("Deleted item {} for {}", item_id, self.user.uid);
        Ok(())
    }

    /// Group two or more distinct items under a fresh set id.
    pub async fn create_set(&self, item_ids: &[String]) -> Result<SetAssignment, SessionError> {
        let ids = dedupe(item_ids);
        if ids.len() < MIN_SET_SIZE {
            return Err(SessionError::Validation(format!(
                "A set needs at least {} different items",
                MIN_SET_SIZE
            )));
        }

        let _gate = self.mutations.lock().await;
        {
            let state = self.state.read().await;
            if let Some(missing) = ids.iter().find(|id| !state.contains_item(id)) {
                return Err(item_not_found(missing));
            }
        }

        let set_id = format!("set-{}", Uuid::new_v4().simple());
        self.backends
            .items
            .update_set_id(&self.user.uid, &ids, Some(&set_id))
            .await
            .map_err(|e| store_write("link these items", e))?;

        let mut state = self.state.write().await;
        for item in state.wardrobe.iter_mut().filter(|i| ids.contains(&i.id)) {
            item.set_id = Some(set_id.clone());
        }
        state.revalidate_generated();
        state.bump();

        tracing::info!("Created set {} with {} items", set_id, ids.len());
        Ok(SetAssignment { set_id, item_ids: ids })
    }

    /// Clear the set id from every item carrying it.
    pub async fn break_set(&self, set_id: &str) -> Result<SetAssignment, SessionError> {
        let _gate = self.mutations.lock().await;

        let ids: Vec<String> = {
            let state = self.state.read().await;
            state
                .wardrobe
                .iter()
                .filter(|i| i.set_id.as_deref() == Some(set_id))
                .map(|i| i.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return Err(SessionError::NotFound(format!("Set {} not found", set_id)));
        }

        self.backends
            .items
            .update_set_id(&self.user.uid, &ids, None)
            .await
            .map_err(|e| store_write("unlink these items", e))?;

        let mut state = self.state.write().await;
        for item in state.wardrobe.iter_mut().filter(|i| ids.contains(&i.id)) {
            item.set_id = None;
        }
        state.revalidate_generated();
        state.bump();

        tracing::info!("Broke set {} ({} items)", set_id, ids.len());
        Ok(SetAssignment {
            set_id: set_id.to_string(),
            item_ids: ids,
        })
    }

    /// Ask the composer for outfits and keep the proposals that respect the wardrobe as
    /// it stands when the composer answers.
    ///
    /// The previous batch is discarded whether or not the composer succeeds.
    pub async fn generate_outfits(
        &self,
        weather: &Weather,
        occasion: Occasion,
    ) -> Result<Vec<GeneratedOutfit>, SessionError> {
        if !weather.is_plausible() {
            return Err(SessionError::Validation(format!(
                "Temperature must be between {} and {} °C",
                Weather::MIN_TEMPERATURE_C,
                Weather::MAX_TEMPERATURE_C
            )));
        }

        let wardrobe = self.wardrobe().await;
        if wardrobe.len() < MIN_ITEMS_FOR_OUTFITS {
            return Err(SessionError::InsufficientWardrobe {
                required: MIN_ITEMS_FOR_OUTFITS,
                actual: wardrobe.len(),
            });
        }

        if self.generating.swap(true, Ordering::AcqRel) {
            return Err(SessionError::GenerationInProgress);
        }
        let _in_flight = InFlight(&self.generating);

        let request: Vec<ComposerItem> = wardrobe.items().iter().map(ComposerItem::from).collect();
        let result = self
            .backends
            .composer
            .compose(&request, weather, occasion)
            .await;

        let mut state = self.state.write().await;
        state.generated.clear();
        state.bump();

        let proposals = result.map_err(|e| {
            tracing::warn!("Outfit composition failed for {}: {}", self.user.uid, e);
            SessionError::Composition(e.to_string())
        })?;

        let proposed = proposals.len();
        let mut outfits = Vec::with_capacity(proposed);
        for proposal in proposals {
            // The wardrobe may have changed while the composer was working
            let items = match accept_proposal(&proposal, &state.wardrobe) {
                Ok(items) => items,
                Err(rejection) => {
                    tracing::warn!("Dropping proposal '{}': {}", proposal.name, rejection);
                    continue;
                }
            };
            let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
            let fingerprint = outfit_fingerprint(&ids);
            let is_saved = state
                .saved
                .iter()
                .any(|s| s.matches(&proposal.name, &fingerprint));

            outfits.push(GeneratedOutfit {
                id: format!("gen-{}", Uuid::new_v4().simple()),
                user_id: self.user.uid.clone(),
                name: proposal.name,
                description: proposal.description,
                items,
                fingerprint,
                render: RenderState::Proposed,
                is_saved,
            });
        }

        tracing::info!(
            "Generated {} outfits for {} ({} proposed)",
            outfits.len(),
            self.user.uid,
            proposed
        );
        state.generated = outfits.clone();
        Ok(outfits)
    }

    /// Render a generated outfit. A render already in flight or finished is returned as is.
    pub async fn render_outfit(&self, outfit_id: &str) -> Result<GeneratedOutfit, SessionError> {
        let items: Vec<RenderItem> = {
            let mut state = self.state.write().await;
            let outfit = state
                .generated
                .iter_mut()
                .find(|o| o.id == outfit_id)
                .ok_or_else(|| outfit_not_found(outfit_id))?;

            if !matches!(outfit.render, RenderState::Proposed) {
                if outfit.is_rendering() {
                    tracing::debug!("Render of outfit {} already in flight", outfit_id);
                }
                return Ok(outfit.clone());
            }
            outfit.render = RenderState::Rendering;
            let items = outfit.items.iter().map(RenderItem::from).collect();
            state.bump();
            items
        };

        let result = self.backends.renderer.render(&items).await;

        let mut state = self.state.write().await;
        // A newer generation may have replaced the batch meanwhile
        let outfit = state
            .generated
            .iter_mut()
            .find(|o| o.id == outfit_id)
            .ok_or_else(|| outfit_not_found(outfit_id))?;

        match result {
            Ok(image) => {
                outfit.render = RenderState::Rendered(image);
                let rendered = outfit.clone();
                state.bump();
                Ok(rendered)
            }
            Err(e) => {
                tracing::warn!("Render of outfit {} failed: {}", outfit_id, e);
                outfit.render = RenderState::Proposed;
                state.bump();
                Err(SessionError::Render {
                    outfit_id: outfit_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Render every outfit still in the proposed state, concurrently.
    pub async fn render_all(&self) -> RenderAllReport {
        let pending: Vec<String> = self
            .state
            .read()
            .await
            .generated
            .iter()
            .filter(|o| matches!(o.render, RenderState::Proposed))
            .map(|o| o.id.clone())
            .collect();

        let results = join_all(pending.iter().map(|id| self.render_outfit(id))).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        RenderAllReport {
            rendered: results.len() - failed,
            failed,
        }
    }

    /// Persist a generated outfit. Saving an outfit that already has a match is a no-op
    /// returning the existing record.
    pub async fn save_outfit(&self, outfit_id: &str) -> Result<SavedOutfit, SessionError> {
        let _gate = self.mutations.lock().await;

        let (outfit, existing) = {
            let state = self.state.read().await;
            let outfit = state
                .generated
                .iter()
                .find(|o| o.id == outfit_id)
                .cloned()
                .ok_or_else(|| outfit_not_found(outfit_id))?;
            let existing = state
                .saved
                .iter()
                .find(|s| s.matches(&outfit.name, &outfit.fingerprint))
                .cloned();
            (outfit, existing)
        };

        if let Some(saved) = existing {
            let mut state = self.state.write().await;
            if state.refresh_saved_flags(&outfit.name, &outfit.fingerprint) {
                state.bump();
            }
            return Ok(saved);
        }

        let saved = self
            .backends
            .outfits
            .create(&self.user.uid, &NewSavedOutfit::from(&outfit))
            .await
            .map_err(|e| store_write("save this outfit", e))?;

        let mut state = self.state.write().await;
        state.saved.push(saved.clone());
        state.refresh_saved_flags(&saved.name, &saved.fingerprint);
        state.bump();

        tracing::info!("Saved outfit '{}' as {}", saved.name, saved.id);
        Ok(saved)
    }

    /// Delete a saved outfit and clear the saved flag on generated outfits it matched.
    pub async fn unsave_outfit(&self, saved_id: &str) -> Result<(), SessionError> {
        let _gate = self.mutations.lock().await;

        let removed = self
            .state
            .read()
            .await
            .saved
            .iter()
            .find(|s| s.id == saved_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(format!("Saved outfit {} not found", saved_id)))?;

        match self.backends.outfits.delete(&self.user.uid, saved_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Saved outfit {} was already gone", saved_id);
            }
            Err(e) => return Err(store_write("remove this outfit", e)),
        }

        let mut state = self.state.write().await;
        state.saved.retain(|s| s.id != saved_id);
        state.refresh_saved_flags(&removed.name, &removed.fingerprint);
        state.bump();

        tracing::info!("Removed saved outfit {}", saved_id);
        Ok(())
    }

    /// Suggest what the wardrobe is missing. Analyzer failures yield a placeholder.
    pub async fn analyze_wardrobe_gaps(&self) -> Result<WardrobeAnalysis, SessionError> {
        let wardrobe = self.wardrobe().await;
        if wardrobe.is_empty() {
            return Err(SessionError::InsufficientWardrobe {
                required: 1,
                actual: 0,
            });
        }

        let request: Vec<ComposerItem> = wardrobe.items().iter().map(ComposerItem::from).collect();

        match self.backends.analyst.analyze(&request).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                tracing::warn!("Wardrobe analysis failed for {}: {}", self.user.uid, e);
                Ok(WardrobeAnalysis::placeholder())
            }
        }
    }
}

fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn item_not_found(item_id: &str) -> SessionError {
    SessionError::NotFound(format!("Item {} not found", item_id))
}

fn outfit_not_found(outfit_id: &str) -> SessionError {
    SessionError::NotFound(format!("Outfit {} not found", outfit_id))
}

fn store_write(action: &str, err: StoreError) -> SessionError {
    tracing::error!("Store write failed while trying to {}: {}", action, err);
    SessionError::StoreWrite(format!("Unable to {}. Please try again.", action))
}
