//! Offline dependency graph commands: `dependencies`, `dependents`,
//! `remove` and `tree`.
//!
//! These read the persisted graph directly; the bot does not need to run.

use super::config::WardenConfig;
use modwarden::graph::{GraphError, GraphStore, ModDependencyGraph};

/// Which way to follow requirement edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Dependencies,
    Dependents,
}

fn store_for(config: &WardenConfig) -> GraphStore {
    GraphStore::for_server(&config.server.config_dir, &config.server.name)
}

/// One-hop listing, one `<id>\t<name>` line per mod.
///
/// Not-found and ambiguous names are returned as errors.
pub fn relation_report(
    graph: &ModDependencyGraph,
    identifier: &str,
    direction: Direction,
) -> Result<String, GraphError> {
    let ids = match direction {
        Direction::Dependencies => graph.dependencies_of(identifier)?,
        Direction::Dependents => graph.dependents_of(identifier)?,
    };

    let lines: Vec<String> = ids
        .iter()
        .map(|id| match graph.node(id) {
            Some(node) if !node.is_stub() => format!("{}\t{}", id, node.mod_name),
            _ => format!("{}\t(unresolved)", id),
        })
        .collect();
    Ok(lines.join("\n"))
}

pub fn execute_relation(
    config: &WardenConfig,
    identifier: &str,
    direction: Direction,
) -> Result<(), Box<dyn std::error::Error>> {
    let graph = store_for(config).load_or_default()?;
    let report = relation_report(&graph, identifier, direction)?;
    if report.is_empty() {
        match direction {
            Direction::Dependencies => println!("{} requires nothing", identifier),
            Direction::Dependents => println!("Nothing requires {}", identifier),
        }
    } else {
        println!("{}", report);
    }
    Ok(())
}

/// Remove a mod from the graph and persist the result
pub fn execute_remove(
    config: &WardenConfig,
    identifier: &str,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = store_for(config);
    let mut graph = store.load_or_default()?;

    let removed = graph.remove(identifier, force)?;
    store.save(&graph)?;

    println!("Removed {} ({})", removed.label(), removed.catalog_id);
    println!("Graph: {}", graph.summary());
    Ok(())
}

/// Print every mod with its direct requirements
pub fn execute_tree(config: &WardenConfig) -> Result<(), Box<dyn std::error::Error>> {
    let graph = store_for(config).load_or_default()?;
    for line in graph.dependency_tree() {
        println!("{}", line);
    }
    println!();
    println!("{}", graph.summary());
    Ok(())
}
