//! reqwest-backed catalog fetcher.

use super::traits::{CatalogError, CatalogFetcher, CatalogResult};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches item pages over HTTP with a per-request timeout
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(timeout: Duration) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modwarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalog {
    async fn fetch_page(&self, url: &str) -> CatalogResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| map_request_error(url, e))
    }
}

fn map_request_error(url: &str, err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_builder() {
        CatalogError::InvalidReference(url.to_string())
    } else {
        CatalogError::Network(format!("{}: {}", url, err))
    }
}
