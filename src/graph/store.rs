//! Graph persistence.
//!
//! Two independent artifacts, both rewritten after every change:
//! - the topology file: node list with attributes plus the edge list
//! - the metadata document: `catalog id -> attributes + required ids`
//!
//! Either one alone is enough to rebuild the graph. Edges in the metadata
//! document are recomputed from each entry's `required` list.

use super::{GraphError, GraphResult, ModDependencyGraph, ModNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One entry of the metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mod_name: String,
    pub workshop_id: String,
    #[serde(default)]
    pub mod_id: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// `catalog id -> entry`
pub type MetadataDocument = BTreeMap<String, MetadataEntry>;

/// Serialized topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub directed: bool,
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Catalog id
    pub name: String,
    #[serde(default)]
    pub mod_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mod_id: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
}

impl ModDependencyGraph {
    /// Build the metadata document from the current topology
    pub fn to_metadata(&self) -> MetadataDocument {
        self.nodes()
            .map(|node| {
                let entry = MetadataEntry {
                    url: node.url.clone(),
                    mod_name: node.mod_name.clone(),
                    workshop_id: node.catalog_id.clone(),
                    mod_id: node.mod_ids.clone(),
                    required: self.requires(&node.catalog_id).to_vec(),
                };
                (node.catalog_id.clone(), entry)
            })
            .collect()
    }

    /// Rebuild a graph from a metadata document.
    ///
    /// Requirements naming ids that have no entry of their own become stubs.
    pub fn from_metadata(document: &MetadataDocument) -> Self {
        let mut graph = ModDependencyGraph::new();

        for (catalog_id, entry) in document {
            graph.upsert_node(ModNode {
                catalog_id: catalog_id.clone(),
                mod_name: entry.mod_name.clone(),
                url: entry.url.clone(),
                mod_ids: entry.mod_id.clone(),
            });
        }
        for (catalog_id, entry) in document {
            for required in &entry.required {
                graph.add_edge(catalog_id, required);
            }
        }

        graph
    }

    pub fn to_topology(&self) -> Topology {
        let nodes = self
            .nodes()
            .map(|node| TopologyNode {
                name: node.catalog_id.clone(),
                mod_name: node.mod_name.clone(),
                url: node.url.clone(),
                mod_id: node.mod_ids.clone(),
            })
            .collect();
        let edges = self
            .nodes()
            .flat_map(|node| {
                self.requires(&node.catalog_id)
                    .iter()
                    .map(move |target| TopologyEdge {
                        source: node.catalog_id.clone(),
                        target: target.clone(),
                    })
            })
            .collect();

        Topology {
            directed: true,
            nodes,
            edges,
        }
    }

    /// Rebuild a graph from a topology.
    ///
    /// Unlike the metadata document, a topology must be self-consistent:
    /// duplicate node names or edges to unknown nodes are rejected.
    pub fn from_topology(topology: &Topology) -> Result<Self, String> {
        if !topology.directed {
            return Err("topology is not directed".to_string());
        }

        let mut graph = ModDependencyGraph::new();
        for node in &topology.nodes {
            if graph.contains(&node.name) {
                return Err(format!("duplicate node '{}'", node.name));
            }
            graph.upsert_node(ModNode {
                catalog_id: node.name.clone(),
                mod_name: node.mod_name.clone(),
                url: node.url.clone(),
                mod_ids: node.mod_id.clone(),
            });
        }
        for edge in &topology.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !graph.contains(endpoint) {
                    return Err(format!("edge references unknown node '{}'", endpoint));
                }
            }
            graph.add_edge(&edge.source, &edge.target);
        }

        Ok(graph)
    }
}

/// Load a graph from a metadata document file
pub fn load_metadata(path: &Path) -> GraphResult<ModDependencyGraph> {
    let contents = read(path)?;
    let document: MetadataDocument =
        serde_json::from_str(&contents).map_err(|e| GraphError::InvalidPersistedState {
            path: path.to_path_buf(),
            reason: format!("not a metadata document: {}", e),
        })?;

    Ok(ModDependencyGraph::from_metadata(&document))
}

/// Load a graph from a topology file
pub fn load_topology(path: &Path) -> GraphResult<ModDependencyGraph> {
    let contents = read(path)?;
    let topology: Topology =
        serde_json::from_str(&contents).map_err(|e| GraphError::InvalidPersistedState {
            path: path.to_path_buf(),
            reason: format!("not a topology file: {}", e),
        })?;

    ModDependencyGraph::from_topology(&topology).map_err(|reason| {
        GraphError::InvalidPersistedState {
            path: path.to_path_buf(),
            reason,
        }
    })
}

pub fn save_metadata(graph: &ModDependencyGraph, path: &Path) -> GraphResult<()> {
    write_json(path, &graph.to_metadata())
}

pub fn save_topology(graph: &ModDependencyGraph, path: &Path) -> GraphResult<()> {
    write_json(path, &graph.to_topology())
}

fn read(path: &Path) -> GraphResult<String> {
    if !path.exists() {
        return Err(GraphError::InvalidPersistedState {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }
    fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write via a sibling temp file and rename, so a crash never leaves a
/// half-written artifact behind.
fn write_json<T: Serialize>(path: &Path, value: &T) -> GraphResult<()> {
    let io_err = |source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    };

    let contents = serde_json::to_string_pretty(value).map_err(|e| {
        io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    Ok(())
}

/// Where a server's graph artifacts live
#[derive(Debug, Clone)]
pub struct GraphStore {
    topology_path: PathBuf,
    metadata_path: PathBuf,
}

impl GraphStore {
    pub fn new(topology_path: PathBuf, metadata_path: PathBuf) -> Self {
        Self {
            topology_path,
            metadata_path,
        }
    }

    /// `<config_dir>/<server>.graph.json` and `<config_dir>/<server>.json`
    pub fn for_server(config_dir: &Path, server_name: &str) -> Self {
        Self::new(
            config_dir.join(format!("{}.graph.json", server_name)),
            config_dir.join(format!("{}.json", server_name)),
        )
    }

    pub fn topology_path(&self) -> &Path {
        &self.topology_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Load the graph at startup.
    ///
    /// The metadata document is preferred since it carries everything; the
    /// topology file is the fallback. With neither present this is a first
    /// run and the graph starts empty.
    pub fn load_or_default(&self) -> GraphResult<ModDependencyGraph> {
        let graph = if self.metadata_path.exists() {
            load_metadata(&self.metadata_path)?
        } else if self.topology_path.exists() {
            load_topology(&self.topology_path)?
        } else {
            debug!(
                metadata = %self.metadata_path.display(),
                "no persisted graph, starting empty"
            );
            return Ok(ModDependencyGraph::new());
        };

        info!(summary = %graph.summary(), "loaded dependency graph");
        Ok(graph)
    }

    /// Rewrite both artifacts
    pub fn save(&self, graph: &ModDependencyGraph) -> GraphResult<()> {
        save_topology(graph, &self.topology_path)?;
        save_metadata(graph, &self.metadata_path)?;
        debug!(summary = %graph.summary(), "persisted dependency graph");
        Ok(())
    }
}
