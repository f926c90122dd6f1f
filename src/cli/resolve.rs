use super::config::WardenConfig;
use modwarden::catalog::{DependencyResolver, HttpCatalog};
use modwarden::graph::GraphStore;

/// Resolve a catalog item and everything it requires, without a vote.
///
/// With `save`, the result is merged into the persisted graph. Nothing is
/// installed either way.
pub async fn execute(
    config: &WardenConfig,
    catalog_id: &str,
    save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if catalog_id.is_empty() || !catalog_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Catalog id must be numeric, got '{}'", catalog_id).into());
    }

    let fetcher = HttpCatalog::new(config.catalog_timeout()?)?;
    let resolver = DependencyResolver::new(
        fetcher,
        config.catalog.item_url_prefix.clone(),
        config.catalog.retry_rounds,
    );

    let resolution = resolver.resolve_id(catalog_id).await;
    if resolution.batch.is_empty() {
        return Err(format!("Could not resolve mod {}", catalog_id).into());
    }

    for item in resolution.batch.iter() {
        println!(
            "{}\t{}\tmods: {}\trequires: {}",
            item.catalog_id,
            item.mod_name,
            item.mod_ids.join(";"),
            item.required.join(", ")
        );
    }
    for url in &resolution.unresolved {
        println!("unresolved (timed out): {}", url);
    }
    for (url, error) in &resolution.failed {
        println!("failed: {} ({})", url, error);
    }

    if save {
        let store = GraphStore::for_server(&config.server.config_dir, &config.server.name);
        let mut graph = store.load_or_default()?;
        let report = graph.merge(&resolution.batch);
        store.save(&graph)?;
        println!(
            "Graph updated: {} added, {} updated, {} new requirements",
            report.nodes_added, report.nodes_updated, report.edges_added
        );
    }

    Ok(())
}
