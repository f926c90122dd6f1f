//! Integration tests for dependency resolution against an unreliable catalog.
//!
//! Covers retry-round recovery, partial results after exhausted retries, and
//! the reqwest fetcher end to end against a local HTTP server.

mod common;

use common::{add_item, item_page, required_link, ITEM_PREFIX};
use httpmock::prelude::*;
use modwarden::catalog::{DependencyResolver, HttpCatalog, MockCatalog};
use std::time::Duration;

#[tokio::test]
async fn test_timeout_recovered_in_first_retry_round() {
    let catalog = MockCatalog::new();
    add_item(&catalog, "123", "Root", &["456", "789"]);
    add_item(&catalog, "456", "Lib", &["999"]);
    add_item(&catalog, "789", "Maps", &[]);
    add_item(&catalog, "999", "Core", &[]);
    catalog.time_out("456", 1);

    let resolver = DependencyResolver::new(catalog.clone(), ITEM_PREFIX, 2);
    let resolution = resolver.resolve_id("123").await;

    assert!(resolution.is_complete());
    let lib = resolution.batch.get("456").expect("456 resolved on retry");
    assert_eq!(lib.mod_name, "Lib");
    assert_eq!(lib.mod_ids, vec!["LibMod"]);
    // The retried item's own subtree is expanded too
    assert!(resolution.batch.contains("999"));
    assert_eq!(catalog.fetch_count("456"), 2);
    assert_eq!(catalog.fetch_count("999"), 1);
}

#[tokio::test]
async fn test_exhausted_retries_leave_subtree_out() {
    let catalog = MockCatalog::new();
    add_item(&catalog, "123", "Root", &["456", "789"]);
    add_item(&catalog, "456", "Lib", &["999"]);
    add_item(&catalog, "789", "Maps", &[]);
    add_item(&catalog, "999", "Core", &[]);
    catalog.time_out("456", 5);

    let resolver = DependencyResolver::new(catalog.clone(), ITEM_PREFIX, 2);
    let resolution = resolver.resolve_id("123").await;

    assert_eq!(resolution.batch.catalog_ids(), vec!["123", "789"]);
    assert_eq!(resolution.unresolved, vec![required_link("456")]);
    // Initial pass plus two retry rounds
    assert_eq!(catalog.fetch_count("456"), 3);
    assert_eq!(catalog.fetch_count("999"), 0);
    // The root still records what it requires
    assert_eq!(
        resolution.batch.get("123").unwrap().required,
        vec!["456", "789"]
    );
}

#[tokio::test]
async fn test_http_catalog_resolution() {
    let server = MockServer::start_async().await;
    let prefix = server.url("/sharedfiles/filedetails/?id=");
    let link = |id: &str| server.url(format!("/workshop/filedetails/?id={}", id));

    let root = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/sharedfiles/filedetails/")
                .query_param("id", "123");
            then.status(200).body(item_page(
                "Root",
                &["RootA", "RootB"],
                &[link("456")],
            ));
        })
        .await;
    let lib = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/workshop/filedetails/")
                .query_param("id", "456");
            then.status(200).body(item_page("Lib", &["LibMod"], &[]));
        })
        .await;

    let fetcher = HttpCatalog::new(Duration::from_secs(5)).unwrap();
    let resolver = DependencyResolver::new(fetcher, prefix, 2);
    let resolution = resolver.resolve_id("123").await;

    root.assert_async().await;
    lib.assert_async().await;
    assert!(resolution.is_complete());
    assert_eq!(resolution.batch.catalog_ids(), vec!["123", "456"]);
    assert_eq!(
        resolution.batch.get("123").unwrap().mod_ids,
        vec!["RootA", "RootB"]
    );
}

#[tokio::test]
async fn test_http_item_exists() {
    let server = MockServer::start_async().await;
    let prefix = server.url("/sharedfiles/filedetails/?id=");

    server
        .mock_async(|when, then| {
            when.path("/sharedfiles/filedetails/").query_param("id", "1");
            then.status(200)
                .body("<html><body><h1>Sorry!</h1><h3>That item does not exist.</h3></body></html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.path("/sharedfiles/filedetails/").query_param("id", "2");
            then.status(200).body(item_page("Real", &["RealMod"], &[]));
        })
        .await;

    let resolver = DependencyResolver::new(
        HttpCatalog::new(Duration::from_secs(5)).unwrap(),
        prefix,
        2,
    );

    assert!(!resolver.item_exists("1").await.unwrap());
    assert!(resolver.item_exists("2").await.unwrap());
}
