//! Catalog item metadata and resolution batches.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything known about one catalog item.
///
/// A single catalog entry may ship several internal mod ids; their order is
/// the order they were declared on the item page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMetadata {
    pub catalog_id: String,
    pub mod_name: String,
    pub url: String,
    pub mod_ids: Vec<String>,
    /// Catalog ids this item declares as required, in page order
    pub required: Vec<String>,
}

/// Ordered result of one dependency resolution.
///
/// Items appear in the order they were first resolved (root first, then a
/// depth-first walk of its requirements). Catalog ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBatch {
    items: Vec<ModMetadata>,
    index: HashMap<String, usize>,
}

impl ResolvedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any earlier entry with the same catalog id
    /// in place (batch position is kept).
    pub fn insert(&mut self, metadata: ModMetadata) {
        match self.index.get(&metadata.catalog_id) {
            Some(&pos) => self.items[pos] = metadata,
            None => {
                self.index
                    .insert(metadata.catalog_id.clone(), self.items.len());
                self.items.push(metadata);
            }
        }
    }

    pub fn contains(&self, catalog_id: &str) -> bool {
        self.index.contains_key(catalog_id)
    }

    pub fn get(&self, catalog_id: &str) -> Option<&ModMetadata> {
        self.index.get(catalog_id).map(|&pos| &self.items[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModMetadata> {
        self.items.iter()
    }

    /// Catalog ids in batch order
    pub fn catalog_ids(&self) -> Vec<String> {
        self.items.iter().map(|m| m.catalog_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[ModMetadata] {
        &self.items
    }
}

impl FromIterator<ModMetadata> for ResolvedBatch {
    fn from_iter<I: IntoIterator<Item = ModMetadata>>(iter: I) -> Self {
        let mut batch = ResolvedBatch::new();
        for metadata in iter {
            batch.insert(metadata);
        }
        batch
    }
}

#[cfg(test)]
pub(crate) fn metadata(catalog_id: &str, name: &str, required: &[&str]) -> ModMetadata {
    ModMetadata {
        catalog_id: catalog_id.to_string(),
        mod_name: name.to_string(),
        url: format!("https://example.test/item?id={}", catalog_id),
        mod_ids: vec![format!("{}Mod", name.replace(' ', ""))],
        required: required.iter().map(|s| s.to_string()).collect(),
    }
}
