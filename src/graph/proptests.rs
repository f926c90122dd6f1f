//! Property-based tests for the dependency graph
//!
//! - Merge: idempotence, edge targets always exist
//! - Persistence: both artifacts reproduce node and edge sets

use super::ModDependencyGraph;
use crate::catalog::{ModMetadata, ResolvedBatch};
use proptest::prelude::*;

/// Batches over a small id space so requirements collide often
fn arb_batch() -> impl Strategy<Value = ResolvedBatch> {
    prop::collection::vec(
        (
            0u8..12,
            "[A-Za-z ]{0,8}",
            prop::collection::vec(0u8..12, 0..4),
        ),
        0..10,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .map(|(id, name, required)| ModMetadata {
                catalog_id: id.to_string(),
                mod_name: name.clone(),
                url: format!("https://example.test/?id={}", id),
                mod_ids: vec![name],
                required: required.into_iter().map(|r| r.to_string()).collect(),
            })
            .collect()
    })
}

fn node_list(graph: &ModDependencyGraph) -> Vec<super::ModNode> {
    graph.nodes().cloned().collect()
}

proptest! {
    /// Property: merging the same batch twice changes nothing the second time
    #[test]
    fn merge_is_idempotent(batch in arb_batch()) {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&batch);
        let nodes = node_list(&graph);
        let edges = graph.edges();

        let report = graph.merge(&batch);

        prop_assert!(report.is_noop());
        prop_assert_eq!(node_list(&graph), nodes);
        prop_assert_eq!(graph.edges(), edges);
    }

    /// Property: every edge endpoint is a node, and no edge is duplicated
    #[test]
    fn edges_reference_existing_nodes(first in arb_batch(), second in arb_batch()) {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&first);
        graph.merge(&second);

        for (owner, required) in graph.edges() {
            prop_assert!(graph.contains(&owner));
            prop_assert!(graph.contains(&required));
        }
        prop_assert_eq!(graph.edges().len(), graph.edge_count());
    }

    /// Property: metadata document round trip keeps nodes and edges
    #[test]
    fn metadata_round_trip(batch in arb_batch()) {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&batch);

        let rebuilt = ModDependencyGraph::from_metadata(&graph.to_metadata());

        prop_assert_eq!(node_list(&rebuilt), node_list(&graph));
        prop_assert_eq!(rebuilt.edges(), graph.edges());
    }

    /// Property: topology round trip keeps nodes and edges
    #[test]
    fn topology_round_trip(batch in arb_batch()) {
        let mut graph = ModDependencyGraph::new();
        graph.merge(&batch);

        let rebuilt = ModDependencyGraph::from_topology(&graph.to_topology()).unwrap();

        prop_assert_eq!(node_list(&rebuilt), node_list(&graph));
        prop_assert_eq!(rebuilt.edges(), graph.edges());
    }
}
