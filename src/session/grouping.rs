//! Validation of composer proposals against the submitted wardrobe.
//!
//! A proposal is accepted only if every id it names exists in the wardrobe and every
//! set it touches is present in full.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::{ClothingItem, OutfitProposal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("proposal has no items")]
    Empty,

    #[error("unknown item id '{0}'")]
    UnknownItem(String),

    #[error("set '{set_id}' is split, missing {missing:?}")]
    SplitSet { set_id: String, missing: Vec<String> },
}

/// Resolve a proposal into wardrobe items, in proposal order and without duplicates.
pub fn accept_proposal(
    proposal: &OutfitProposal,
    wardrobe: &[ClothingItem],
) -> Result<Vec<ClothingItem>, Rejection> {
    resolve_items(&proposal.item_ids, wardrobe)
}

/// Same rules as [`accept_proposal`] for a bare list of ids.
pub fn resolve_items(
    item_ids: &[String],
    wardrobe: &[ClothingItem],
) -> Result<Vec<ClothingItem>, Rejection> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for id in item_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let item = wardrobe
            .iter()
            .find(|i| &i.id == id)
            .ok_or_else(|| Rejection::UnknownItem(id.clone()))?;
        members.push(item.clone());
    }

    if members.is_empty() {
        return Err(Rejection::Empty);
    }

    let mut checked = HashSet::new();
    for set_id in members.iter().filter_map(|i| i.set_id.as_deref()) {
        if !checked.insert(set_id) {
            continue;
        }
        let missing: Vec<String> = wardrobe
            .iter()
            .filter(|i| i.set_id.as_deref() == Some(set_id) && !seen.contains(i.id.as_str()))
            .map(|i| i.id.clone())
            .collect();
        if !missing.is_empty() {
            return Err(Rejection::SplitSet {
                set_id: set_id.to_string(),
                missing,
            });
        }
    }

    Ok(members)
}
