//! Dependency resolution against the catalog.
//!
//! Walks an item's requirements depth-first with an explicit work stack and a
//! visited check keyed by catalog id: an id already in the batch is never
//! fetched or expanded again. Timed-out requests park their URL in a pending
//! set; bounded retry rounds re-run the walk from each parked URL. Whatever is
//! still pending after the last round is left out of the result.

use super::page::{catalog_id_from_url, is_missing_item_page, parse_item_page, url_for_catalog_id};
use super::traits::{CatalogError, CatalogFetcher, CatalogResult};
use super::types::{ModMetadata, ResolvedBatch};
use tracing::{debug, info, warn};

/// Outcome of resolving one root item
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub batch: ResolvedBatch,
    /// URLs that still failed transiently after every retry round
    pub unresolved: Vec<String>,
    /// Items that were fetched but could not be used (not retried)
    pub failed: Vec<(String, CatalogError)>,
}

impl Resolution {
    /// True when every reachable item made it into the batch
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.failed.is_empty()
    }
}

/// Resolves an item and everything it transitively requires
pub struct DependencyResolver<F: CatalogFetcher> {
    fetcher: F,
    item_url_prefix: String,
    retry_rounds: u32,
}

/// Working state shared by the initial pass and the retry rounds
#[derive(Default)]
struct Walk {
    batch: ResolvedBatch,
    pending: Vec<String>,
    failed: Vec<(String, CatalogError)>,
}

impl<F: CatalogFetcher> DependencyResolver<F> {
    pub fn new(fetcher: F, item_url_prefix: impl Into<String>, retry_rounds: u32) -> Self {
        Self {
            fetcher,
            item_url_prefix: item_url_prefix.into(),
            retry_rounds,
        }
    }

    /// Canonical item URL for a catalog id
    pub fn url_for(&self, catalog_id: &str) -> String {
        url_for_catalog_id(&self.item_url_prefix, catalog_id)
    }

    /// Check that the catalog knows the item.
    ///
    /// Transient failures are returned as errors so the caller can tell
    /// "does not exist" apart from "could not ask".
    pub async fn item_exists(&self, catalog_id: &str) -> CatalogResult<bool> {
        let url = self.url_for(catalog_id);
        match self.fetcher.fetch_page(&url).await {
            Ok(html) => Ok(!is_missing_item_page(&html)),
            Err(CatalogError::Http { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve by catalog id
    pub async fn resolve_id(&self, catalog_id: &str) -> Resolution {
        self.resolve(&self.url_for(catalog_id)).await
    }

    /// Resolve the item at `root_url` and its full requirement chain.
    pub async fn resolve(&self, root_url: &str) -> Resolution {
        let mut walk = Walk::default();
        self.expand(root_url, &mut walk).await;

        for round in 1..=self.retry_rounds {
            if walk.pending.is_empty() {
                break;
            }
            let retry = std::mem::take(&mut walk.pending);
            debug!(round, urls = retry.len(), "retrying timed-out catalog requests");
            for url in retry {
                self.expand(&url, &mut walk).await;
            }
        }

        if !walk.pending.is_empty() {
            warn!(
                root = %root_url,
                unresolved = ?walk.pending,
                "catalog requests still failing after retries; result is partial"
            );
        }
        info!(
            root = %root_url,
            resolved = walk.batch.len(),
            "dependency resolution finished"
        );

        Resolution {
            batch: walk.batch,
            unresolved: walk.pending,
            failed: walk.failed,
        }
    }

    /// Depth-first expansion from `start_url`.
    ///
    /// Children are pushed in reverse so the first declared requirement is
    /// fully expanded before its next sibling.
    async fn expand(&self, start_url: &str, walk: &mut Walk) {
        let mut stack = vec![start_url.to_string()];

        while let Some(url) = stack.pop() {
            let Some(catalog_id) = catalog_id_from_url(&url) else {
                warn!(url = %url, "skipping link without a catalog id");
                walk.failed
                    .push((url.clone(), CatalogError::InvalidReference(url)));
                continue;
            };
            if walk.batch.contains(&catalog_id) {
                continue;
            }

            match self.fetch_item(&url, &catalog_id).await {
                Ok((metadata, required_urls)) => {
                    debug!(catalog_id = %catalog_id, name = %metadata.mod_name, "resolved item");
                    walk.batch.insert(metadata);
                    for child in required_urls.into_iter().rev() {
                        let seen = catalog_id_from_url(&child)
                            .map(|id| walk.batch.contains(&id))
                            .unwrap_or(false);
                        if !seen {
                            stack.push(child);
                        }
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(url = %url, error = %e, "catalog request failed, will retry");
                    if !walk.pending.contains(&url) {
                        walk.pending.push(url);
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "skipping item");
                    walk.failed.push((url, e));
                }
            }
        }
    }

    /// Fetch and parse one item page.
    ///
    /// Returns the item's metadata and the raw links to its requirements.
    async fn fetch_item(
        &self,
        url: &str,
        catalog_id: &str,
    ) -> CatalogResult<(ModMetadata, Vec<String>)> {
        let html = self.fetcher.fetch_page(url).await?;
        let page = parse_item_page(url, &html)?;

        let mut required = Vec::new();
        let mut required_urls = Vec::new();
        for link in page.required_urls {
            match catalog_id_from_url(&link) {
                Some(id) if id == catalog_id => {
                    debug!(catalog_id = %catalog_id, "ignoring self-reference");
                }
                Some(id) => {
                    if !required.contains(&id) {
                        required.push(id);
                        required_urls.push(link);
                    }
                }
                None => warn!(link = %link, "required item link has no catalog id"),
            }
        }

        let metadata = ModMetadata {
            catalog_id: catalog_id.to_string(),
            mod_name: page.title,
            url: url.to_string(),
            mod_ids: page.mod_ids,
            required,
        };

        Ok((metadata, required_urls))
    }
}
