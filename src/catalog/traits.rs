//! Catalog access abstraction.
//!
//! The external catalog is slow and unreliable. Fetching goes through
//! `CatalogFetcher` so the resolver can be exercised against `MockCatalog`.

use async_trait::async_trait;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Not a catalog item reference: {0}")]
    InvalidReference(String),
}

impl CatalogError {
    /// Transient failures worth another attempt in a later retry round.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Timeout { .. } | CatalogError::Network(_))
    }
}

/// Fetches raw item pages from the catalog
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// GET the page at `url` and return its body
    async fn fetch_page(&self, url: &str) -> CatalogResult<String>;
}

#[async_trait]
impl<T: CatalogFetcher + ?Sized> CatalogFetcher for std::sync::Arc<T> {
    async fn fetch_page(&self, url: &str) -> CatalogResult<String> {
        (**self).fetch_page(url).await
    }
}
