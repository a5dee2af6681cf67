//! Read-only view over a user's wardrobe: category partition, filters and sets.

use std::collections::BTreeMap;

use crate::models::{
    CategoryGroup, ClothingCategory, ClothingItem, ItemFilter, SetAssignment, WardrobeView,
};

#[derive(Debug, Clone, Default)]
pub struct WardrobeSnapshot {
    items: Vec<ClothingItem>,
}

impl WardrobeSnapshot {
    pub fn new(items: Vec<ClothingItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ClothingItem] {
        &self.items
    }

    pub fn in_category(&self, category: ClothingCategory) -> impl Iterator<Item = &ClothingItem> {
        self.items.iter().filter(move |i| i.category == category)
    }

    /// Items of a category matching the exact color and/or material.
    pub fn filter(&self, category: ClothingCategory, filter: &ItemFilter) -> Vec<&ClothingItem> {
        self.in_category(category)
            .filter(|i| filter.color.as_ref().map_or(true, |c| &i.color == c))
            .filter(|i| filter.material.as_ref().map_or(true, |m| &i.material == m))
            .collect()
    }

    pub fn available_colors(&self, category: ClothingCategory) -> Vec<String> {
        distinct(self.in_category(category).map(|i| &i.color))
    }

    pub fn available_materials(&self, category: ClothingCategory) -> Vec<String> {
        distinct(self.in_category(category).map(|i| &i.material))
    }

    /// Current set groups keyed by set id.
    pub fn sets(&self) -> BTreeMap<&str, Vec<&ClothingItem>> {
        let mut sets: BTreeMap<&str, Vec<&ClothingItem>> = BTreeMap::new();
        for item in &self.items {
            if let Some(set_id) = item.set_id.as_deref() {
                sets.entry(set_id).or_default().push(item);
            }
        }
        sets
    }

    /// Every category in display order. With `filter.category` set, that category is
    /// narrowed by the filter and the available colors/materials are reported for it.
    pub fn view(&self, filter: &ItemFilter) -> WardrobeView {
        let categories = ClothingCategory::ALL
            .iter()
            .map(|&category| {
                let items: Vec<ClothingItem> = if filter.category == Some(category) {
                    self.filter(category, filter).into_iter().cloned().collect()
                } else {
                    self.in_category(category).cloned().collect()
                };
                CategoryGroup {
                    category,
                    count: self.in_category(category).count(),
                    items,
                }
            })
            .collect();

        let (available_colors, available_materials) = match filter.category {
            Some(category) => (
                self.available_colors(category),
                self.available_materials(category),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let sets = self
            .sets()
            .into_iter()
            .map(|(set_id, members)| SetAssignment {
                set_id: set_id.to_string(),
                item_ids: members.iter().map(|i| i.id.clone()).collect(),
            })
            .collect();

        WardrobeView {
            total: self.items.len(),
            categories,
            available_colors,
            available_materials,
            sets,
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
