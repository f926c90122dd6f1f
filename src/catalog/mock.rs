//! In-memory catalog for testing.
//!
//! Pages are keyed by catalog id (taken from the requested URL), so links in
//! either URL form reach the same item. Failures can be scripted per id.

use super::page::catalog_id_from_url;
use super::traits::{CatalogError, CatalogFetcher, CatalogResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockCatalog {
    state: Arc<Mutex<MockCatalogState>>,
}

#[derive(Default)]
struct MockCatalogState {
    pages: HashMap<String, String>,
    /// Remaining timeouts to return before serving the page
    timeouts: HashMap<String, u32>,
    fetches: Vec<String>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for the given catalog id
    pub fn add_page(&self, catalog_id: &str, html: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(catalog_id.to_string(), html.into());
    }

    /// Time out the next `count` requests for `catalog_id`
    pub fn time_out(&self, catalog_id: &str, count: u32) {
        self.state
            .lock()
            .unwrap()
            .timeouts
            .insert(catalog_id.to_string(), count);
    }

    /// Catalog ids requested so far, in request order
    pub fn fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub fn fetch_count(&self, catalog_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fetches
            .iter()
            .filter(|id| id.as_str() == catalog_id)
            .count()
    }
}

#[async_trait]
impl CatalogFetcher for MockCatalog {
    async fn fetch_page(&self, url: &str) -> CatalogResult<String> {
        let catalog_id = catalog_id_from_url(url)
            .ok_or_else(|| CatalogError::InvalidReference(url.to_string()))?;

        let mut state = self.state.lock().unwrap();
        state.fetches.push(catalog_id.clone());

        if let Some(remaining) = state.timeouts.get_mut(&catalog_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CatalogError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        state
            .pages
            .get(&catalog_id)
            .cloned()
            .ok_or_else(|| CatalogError::Http {
                url: url.to_string(),
                status: 404,
            })
    }
}
