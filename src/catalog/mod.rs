//! Catalog access and dependency resolution.
//!
//! - `page`: item page parsing (title, internal mod ids, required links)
//! - `resolver`: depth-first requirement walk with bounded retry rounds
//! - `http`: production fetcher (reqwest)
//! - `mock`: scripted in-memory fetcher for tests

pub mod http;
pub mod mock;
pub mod page;
pub mod resolver;
pub mod traits;
pub mod types;

pub use http::HttpCatalog;
pub use mock::MockCatalog;
pub use page::{catalog_id_from_url, url_for_catalog_id};
pub use resolver::{DependencyResolver, Resolution};
pub use traits::{CatalogError, CatalogFetcher, CatalogResult};
pub use types::{ModMetadata, ResolvedBatch};
