//! Installed-mod dependency graph.
//!
//! Nodes are catalog items keyed by catalog id; a directed edge `a -> b` means
//! "a requires b". A node referenced only as a requirement and never resolved
//! itself is a stub (empty name, url and mod ids).
//!
//! The graph is an id-indexed adjacency table: each entry keeps its
//! successors (requires) and predecessors (required by) in insertion order.

pub mod store;

#[cfg(test)]
mod proptests;

use crate::catalog::ResolvedBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub use store::{GraphStore, MetadataDocument, MetadataEntry, Topology};

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("No mod found with name or ID '{0}'")]
    NotFound(String),

    #[error("Ambiguous mod name '{identifier}'; matches {matches:?}")]
    AmbiguousIdentifier {
        identifier: String,
        matches: Vec<String>,
    },

    #[error("Mod {catalog_id} can't be removed, it is required by {dependents:?}")]
    DeleteConflict {
        catalog_id: String,
        dependents: Vec<String>,
    },

    #[error("Invalid persisted graph '{}': {reason}", path.display())]
    InvalidPersistedState { path: PathBuf, reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Node attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModNode {
    pub catalog_id: String,
    pub mod_name: String,
    pub url: String,
    pub mod_ids: Vec<String>,
}

impl ModNode {
    /// Placeholder for a requirement that has not been resolved yet
    pub fn stub(catalog_id: &str) -> Self {
        Self {
            catalog_id: catalog_id.to_string(),
            mod_name: String::new(),
            url: String::new(),
            mod_ids: Vec::new(),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.mod_name.is_empty() && self.url.is_empty() && self.mod_ids.is_empty()
    }

    /// Display name, falling back to the catalog id for stubs
    pub fn label(&self) -> &str {
        if self.mod_name.is_empty() {
            &self.catalog_id
        } else {
            &self.mod_name
        }
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    node: ModNode,
    requires: Vec<String>,
    required_by: Vec<String>,
}

impl NodeEntry {
    fn new(node: ModNode) -> Self {
        Self {
            node,
            requires: Vec::new(),
            required_by: Vec::new(),
        }
    }
}

/// What a merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub edges_added: usize,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        *self == MergeReport::default()
    }
}

/// Persistent dependency graph of installed catalog items
#[derive(Debug, Clone, Default)]
pub struct ModDependencyGraph {
    nodes: BTreeMap<String, NodeEntry>,
}

impl ModDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a resolution batch.
    ///
    /// Every item in the batch is created or has its attributes replaced;
    /// every declared requirement gets a node (stub if unknown) and an edge
    /// from its owner. Repeating a batch changes nothing.
    pub fn merge(&mut self, batch: &ResolvedBatch) -> MergeReport {
        let mut report = MergeReport::default();

        for metadata in batch.iter() {
            let node = ModNode {
                catalog_id: metadata.catalog_id.clone(),
                mod_name: metadata.mod_name.clone(),
                url: metadata.url.clone(),
                mod_ids: metadata.mod_ids.clone(),
            };
            match self.nodes.get_mut(&metadata.catalog_id) {
                Some(entry) => {
                    if entry.node != node {
                        entry.node = node;
                        report.nodes_updated += 1;
                    }
                }
                None => {
                    self.nodes
                        .insert(metadata.catalog_id.clone(), NodeEntry::new(node));
                    report.nodes_added += 1;
                }
            }

            for required in &metadata.required {
                if self.ensure_node(required) {
                    report.nodes_added += 1;
                }
                if self.add_edge(&metadata.catalog_id, required) {
                    report.edges_added += 1;
                }
            }
        }

        report
    }

    /// Insert a node, replacing the attributes of an existing one
    pub fn upsert_node(&mut self, node: ModNode) {
        match self.nodes.get_mut(&node.catalog_id) {
            Some(entry) => entry.node = node,
            None => {
                self.nodes
                    .insert(node.catalog_id.clone(), NodeEntry::new(node));
            }
        }
    }

    /// Create a stub for `catalog_id` if absent. Returns true if created.
    fn ensure_node(&mut self, catalog_id: &str) -> bool {
        if self.nodes.contains_key(catalog_id) {
            return false;
        }
        self.nodes
            .insert(catalog_id.to_string(), NodeEntry::new(ModNode::stub(catalog_id)));
        true
    }

    /// Add `owner -> required`, creating a stub target if needed.
    ///
    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, owner: &str, required: &str) -> bool {
        self.ensure_node(owner);
        self.ensure_node(required);

        let Some(source) = self.nodes.get_mut(owner) else {
            return false;
        };
        if source.requires.iter().any(|r| r == required) {
            return false;
        }
        source.requires.push(required.to_string());

        if let Some(target) = self.nodes.get_mut(required) {
            target.required_by.push(owner.to_string());
        }
        true
    }

    /// Resolve an identifier to a catalog id.
    ///
    /// Exact catalog id wins; otherwise a case-insensitive display-name match
    /// must be unique.
    pub fn resolve_identifier(&self, identifier: &str) -> GraphResult<&str> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(GraphError::NotFound(identifier.to_string()));
        }

        if let Some((id, _)) = self.nodes.get_key_value(identifier) {
            return Ok(id.as_str());
        }

        let wanted = identifier.to_lowercase();
        let matches: Vec<&str> = self
            .nodes
            .iter()
            .filter(|(_, entry)| entry.node.mod_name.to_lowercase() == wanted)
            .map(|(id, _)| id.as_str())
            .collect();

        match matches.as_slice() {
            [] => Err(GraphError::NotFound(identifier.to_string())),
            [only] => Ok(*only),
            _ => Err(GraphError::AmbiguousIdentifier {
                identifier: identifier.to_string(),
                matches: matches.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }

    /// Catalog ids the identified mod requires (one hop)
    pub fn dependencies_of(&self, identifier: &str) -> GraphResult<Vec<String>> {
        let id = self.resolve_identifier(identifier)?;
        Ok(self.nodes[id].requires.clone())
    }

    /// Catalog ids of mods that require the identified mod (one hop)
    pub fn dependents_of(&self, identifier: &str) -> GraphResult<Vec<String>> {
        let id = self.resolve_identifier(identifier)?;
        Ok(self.nodes[id].required_by.clone())
    }

    /// Remove a node and all its edges.
    ///
    /// Refused while other mods still require it, unless `force` is set.
    pub fn remove(&mut self, identifier: &str, force: bool) -> GraphResult<ModNode> {
        let id = self.resolve_identifier(identifier)?.to_string();

        let dependents = self.nodes[&id].required_by.clone();
        if !dependents.is_empty() && !force {
            return Err(GraphError::DeleteConflict {
                catalog_id: id,
                dependents,
            });
        }

        let Some(entry) = self.nodes.remove(&id) else {
            return Err(GraphError::NotFound(id));
        };
        for required in &entry.requires {
            if let Some(target) = self.nodes.get_mut(required) {
                target.required_by.retain(|r| r != &id);
            }
        }
        for owner in &entry.required_by {
            if let Some(source) = self.nodes.get_mut(owner) {
                source.requires.retain(|r| r != &id);
            }
        }

        Ok(entry.node)
    }

    pub fn node(&self, catalog_id: &str) -> Option<&ModNode> {
        self.nodes.get(catalog_id).map(|entry| &entry.node)
    }

    pub fn contains(&self, catalog_id: &str) -> bool {
        self.nodes.contains_key(catalog_id)
    }

    /// Nodes in catalog id order
    pub fn nodes(&self) -> impl Iterator<Item = &ModNode> {
        self.nodes.values().map(|entry| &entry.node)
    }

    /// Requirements of a node by exact catalog id
    pub fn requires(&self, catalog_id: &str) -> &[String] {
        self.nodes
            .get(catalog_id)
            .map(|entry| entry.requires.as_slice())
            .unwrap_or(&[])
    }

    /// Every edge as `(owner, required)`
    pub fn edges(&self) -> BTreeSet<(String, String)> {
        self.nodes
            .iter()
            .flat_map(|(id, entry)| {
                entry
                    .requires
                    .iter()
                    .map(move |required| (id.clone(), required.clone()))
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|entry| entry.requires.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mod_names(&self) -> Vec<String> {
        self.nodes
            .values()
            .map(|entry| entry.node.mod_name.clone())
            .collect()
    }

    /// One line per mod listing its direct requirements by name
    pub fn dependency_tree(&self) -> Vec<String> {
        self.nodes
            .values()
            .map(|entry| {
                if entry.requires.is_empty() {
                    format!("{} requires nothing", entry.node.label())
                } else {
                    let names: Vec<&str> = entry
                        .requires
                        .iter()
                        .map(|id| self.node(id).map(ModNode::label).unwrap_or(id.as_str()))
                        .collect();
                    format!("{} requires {:?}", entry.node.label(), names)
                }
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let stubs = self.nodes().filter(|n| n.is_stub()).count();
        format!(
            "{} mods ({} unresolved), {} requirements",
            self.node_count(),
            stubs,
            self.edge_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::metadata;

    fn scenario_batch() -> ResolvedBatch {
        [
            metadata("123", "Root", &["456", "789"]),
            metadata("456", "Lib", &[]),
            metadata("789", "Maps", &[]),
        ]
        .into_iter()
        .collect()
    }

    fn edge(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_merge_creates_nodes_and_edges() {
        let mut graph = ModDependencyGraph::new();
        let report = graph.merge(&scenario_batch());

        assert_eq!(report.nodes_added, 3);
        assert_eq!(report.edges_added, 2);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(
            graph.edges(),
            [edge("123", "456"), edge("123", "789")].into_iter().collect()
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());
        let edges = graph.edges();

        let report = graph.merge(&scenario_batch());
        assert!(report.is_noop());
        assert_eq!(graph.edges(), edges);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_merge_creates_stub_then_fills_it() {
        let mut graph = ModDependencyGraph::new();
        let batch: ResolvedBatch = [metadata("1", "Top", &["2"])].into_iter().collect();
        graph.merge(&batch);

        assert!(graph.node("2").unwrap().is_stub());

        let later: ResolvedBatch = [metadata("2", "Bottom", &[])].into_iter().collect();
        let report = graph.merge(&later);
        assert_eq!(report.nodes_updated, 1);
        assert_eq!(graph.node("2").unwrap().mod_name, "Bottom");
        assert_eq!(graph.dependents_of("2").unwrap(), vec!["1"]);
    }

    #[test]
    fn test_merge_updates_attributes() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        let mut renamed = metadata("456", "Lib v2", &[]);
        renamed.mod_ids = vec!["LibA".to_string(), "LibB".to_string()];
        graph.merge(&[renamed].into_iter().collect());

        let node = graph.node("456").unwrap();
        assert_eq!(node.mod_name, "Lib v2");
        assert_eq!(node.mod_ids, vec!["LibA", "LibB"]);
    }

    #[test]
    fn test_queries_by_id_and_name() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        assert_eq!(graph.dependencies_of("123").unwrap(), vec!["456", "789"]);
        assert_eq!(graph.dependencies_of("root").unwrap(), vec!["456", "789"]);
        assert_eq!(graph.dependents_of("LIB").unwrap(), vec!["123"]);
        assert!(graph.dependencies_of("456").unwrap().is_empty());
    }

    #[test]
    fn test_query_not_found() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        assert!(matches!(
            graph.dependencies_of("nope"),
            Err(GraphError::NotFound(_))
        ));
        assert!(matches!(graph.dependents_of(""), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn test_query_ambiguous_name() {
        let mut graph = ModDependencyGraph::new();
        let batch: ResolvedBatch = [
            metadata("1", "Common Sense", &[]),
            metadata("2", "common sense", &[]),
        ]
        .into_iter()
        .collect();
        graph.merge(&batch);

        match graph.dependents_of("COMMON SENSE") {
            Err(GraphError::AmbiguousIdentifier { matches, .. }) => {
                assert_eq!(matches, vec!["1", "2"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        // Exact ids still work
        assert!(graph.dependents_of("1").is_ok());
    }

    #[test]
    fn test_exact_id_beats_name_match() {
        let mut graph = ModDependencyGraph::new();
        // A mod literally named like another mod's catalog id
        let batch: ResolvedBatch = [metadata("1", "Alpha", &[]), metadata("2", "1", &["1"])]
            .into_iter()
            .collect();
        graph.merge(&batch);

        assert_eq!(graph.dependents_of("1").unwrap(), vec!["2"]);
    }

    #[test]
    fn test_remove_rejected_with_dependents() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        match graph.remove("456", false) {
            Err(GraphError::DeleteConflict {
                catalog_id,
                dependents,
            }) => {
                assert_eq!(catalog_id, "456");
                assert_eq!(dependents, vec!["123"]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(graph.contains("456"));
    }

    #[test]
    fn test_remove_leaf_and_root() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        let removed = graph.remove("Root", false).unwrap();
        assert_eq!(removed.catalog_id, "123");
        assert!(graph.edges().is_empty());
        assert!(graph.dependents_of("456").unwrap().is_empty());
    }

    #[test]
    fn test_forced_remove_drops_incoming_edges() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&scenario_batch());

        graph.remove("456", true).unwrap();
        assert!(!graph.contains("456"));
        assert_eq!(graph.dependencies_of("123").unwrap(), vec!["789"]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_dependency_tree_and_summary() {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&[metadata("1", "Top", &["2", "3"])].into_iter().collect());
        graph.merge(&[metadata("2", "Mid", &[])].into_iter().collect());

        let tree = graph.dependency_tree();
        assert_eq!(
            tree,
            vec![
                "Top requires [\"Mid\", \"3\"]".to_string(),
                "Mid requires nothing".to_string(),
                "3 requires nothing".to_string(),
            ]
        );
        assert_eq!(graph.summary(), "3 mods (1 unresolved), 2 requirements");
        assert_eq!(graph.mod_names(), vec!["Top", "Mid", ""]);
    }
}
