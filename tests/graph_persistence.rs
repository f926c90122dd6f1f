//! Integration tests for dependency graph persistence.
//!
//! Both artifacts must reproduce the graph on their own, and repeated
//! resolutions of the same root must not change it.

mod common;

use common::{add_item, ITEM_PREFIX};
use modwarden::catalog::{DependencyResolver, MockCatalog};
use modwarden::graph::store::{load_metadata, load_topology};
use modwarden::graph::{GraphError, GraphStore, ModDependencyGraph};
use tempfile::TempDir;

async fn resolved_graph(catalog: &MockCatalog) -> ModDependencyGraph {
    let resolver = DependencyResolver::new(catalog.clone(), ITEM_PREFIX, 2);
    let mut graph = ModDependencyGraph::new();
    graph.merge(&resolver.resolve_id("123").await.batch);
    graph
}

fn sample_catalog() -> MockCatalog {
    let catalog = MockCatalog::new();
    add_item(&catalog, "123", "Root", &["456", "789"]);
    add_item(&catalog, "456", "Lib", &["789"]);
    add_item(&catalog, "789", "Core", &[]);
    catalog
}

#[tokio::test]
async fn test_each_artifact_restores_the_graph() {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::for_server(dir.path(), "servertest");
    let graph = resolved_graph(&sample_catalog()).await;
    store.save(&graph).unwrap();

    let from_metadata = load_metadata(store.metadata_path()).unwrap();
    let from_topology = load_topology(store.topology_path()).unwrap();

    for restored in [&from_metadata, &from_topology] {
        assert_eq!(restored.edges(), graph.edges());
        let ids: Vec<_> = restored.nodes().map(|n| n.catalog_id.clone()).collect();
        assert_eq!(ids, vec!["123", "456", "789"]);
        assert_eq!(restored.node("456").unwrap().mod_ids, vec!["LibMod"]);
    }
}

#[tokio::test]
async fn test_metadata_document_layout() {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::for_server(dir.path(), "servertest");
    store
        .save(&resolved_graph(&sample_catalog()).await)
        .unwrap();

    let raw = std::fs::read_to_string(store.metadata_path()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let root = &doc["123"];
    assert_eq!(root["mod_name"], "Root");
    assert_eq!(root["workshop_id"], "123");
    assert_eq!(root["mod_id"], serde_json::json!(["RootMod"]));
    assert_eq!(root["required"], serde_json::json!(["456", "789"]));
    assert_eq!(root["url"], format!("{}123", ITEM_PREFIX));
}

#[tokio::test]
async fn test_repeated_resolution_is_idempotent() {
    let catalog = sample_catalog();
    let resolver = DependencyResolver::new(catalog.clone(), ITEM_PREFIX, 2);

    let mut graph = ModDependencyGraph::new();
    let first = graph.merge(&resolver.resolve_id("123").await.batch);
    let edges = graph.edges();
    let second = graph.merge(&resolver.resolve_id("123").await.batch);

    assert_eq!(first.nodes_added, 3);
    assert_eq!(first.edges_added, 3);
    assert!(second.is_noop());
    assert_eq!(graph.edges(), edges);
}

#[tokio::test]
async fn test_stub_filled_in_by_later_resolution() {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::for_server(dir.path(), "servertest");
    let catalog = sample_catalog();
    catalog.time_out("789", 10);

    let mut graph = resolved_graph(&catalog).await;
    assert!(graph.node("789").unwrap().is_stub());
    store.save(&graph).unwrap();

    // Catalog recovers; a later approval of an item requiring 789 fills it in
    let catalog = sample_catalog();
    let resolver = DependencyResolver::new(catalog, ITEM_PREFIX, 2);
    graph.merge(&resolver.resolve_id("456").await.batch);
    store.save(&graph).unwrap();

    let reloaded = store.load_or_default().unwrap();
    let core = reloaded.node("789").unwrap();
    assert!(!core.is_stub());
    assert_eq!(core.mod_name, "Core");
    assert_eq!(reloaded.dependents_of("Core").unwrap(), vec!["123", "456"]);
}

#[test]
fn test_invalid_artifacts_rejected() {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::for_server(dir.path(), "servertest");

    assert!(matches!(
        load_metadata(store.metadata_path()),
        Err(GraphError::InvalidPersistedState { .. })
    ));

    std::fs::write(store.topology_path(), "{\"not\": \"a graph\"}").unwrap();
    assert!(matches!(
        load_topology(store.topology_path()),
        Err(GraphError::InvalidPersistedState { .. })
    ));
    // Startup load falls back to the broken topology file and reports it
    assert!(store.load_or_default().is_err());
}
