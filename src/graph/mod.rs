//! Kind Dependency Graph
//!
//! One node per registered kind, one edge per parent reference, pointing from
//! the child kind to the parent kind. Resolution walks the kinds so that every
//! parent kind is finished before any kind that references it.

pub mod analysis;

pub use analysis::{find_cycles, KindCycle};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

use crate::error::ResolutionError;
use crate::registry::SchemaRegistry;
use crate::schema::Kind;

/// Kinds linked by their declared parent relations
#[derive(Debug, Clone)]
pub struct KindGraph {
    /// Edge weight is the relation name
    pub(crate) graph: DiGraph<Kind, &'static str>,
    /// Node index lookup: kind -> NodeIndex
    pub(crate) node_indices: HashMap<Kind, NodeIndex>,
}

impl KindGraph {
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        let mut graph = DiGraph::with_capacity(registry.len(), registry.len() * 2);
        let mut node_indices = HashMap::with_capacity(registry.len());

        // Node indices follow registration order
        for kind in registry.kinds() {
            node_indices.insert(kind, graph.add_node(kind));
        }

        for schema in registry.schemas() {
            let from = node_indices[&schema.kind];
            for parent in &schema.parents {
                if let Some(&to) = node_indices.get(&parent.target_kind) {
                    graph.add_edge(from, to, parent.relation);
                }
            }
        }

        Self { graph, node_indices }
    }

    pub fn kind_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Kinds referenced as parents by `kind`
    pub fn parents_of(&self, kind: Kind) -> Vec<Kind> {
        self.neighbors(kind, Direction::Outgoing)
    }

    /// Kinds that reference `kind` as a parent
    pub fn children_of(&self, kind: Kind) -> Vec<Kind> {
        self.neighbors(kind, Direction::Incoming)
    }

    fn neighbors(&self, kind: Kind, direction: Direction) -> Vec<Kind> {
        let Some(&idx) = self.node_indices.get(&kind) else {
            return Vec::new();
        };
        let mut kinds: Vec<Kind> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        kinds.sort_by_key(|k| self.node_indices[k]);
        kinds.dedup();
        kinds
    }

    pub fn cycles(&self) -> Vec<KindCycle> {
        find_cycles(self)
    }

    /// Parents-first processing order.
    ///
    /// Kinds with no ordering constraint between them keep registration order.
    pub fn topological_order(&self) -> Result<Vec<Kind>, ResolutionError> {
        if let Some(cycle) = find_cycles(self).into_iter().next() {
            return Err(cycle.into_error());
        }

        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.edges_directed(n, Direction::Outgoing).count())
            .collect();
        let mut ready: BTreeSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| pending[n.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(node) = ready.pop_first() {
            order.push(self.graph[node]);
            for edge in self.graph.edges_directed(node, Direction::Incoming) {
                let child = edge.source();
                pending[child.index()] -= 1;
                if pending[child.index()] == 0 {
                    ready.insert(child);
                }
            }
        }

        Ok(order)
    }

    /// Check an explicit processing order: every kind exactly once, each
    /// parent kind ahead of the kinds referencing it.
    pub fn validate_order(&self, order: &[Kind]) -> Result<(), ResolutionError> {
        let mut position = HashMap::with_capacity(order.len());
        for (pos, kind) in order.iter().enumerate() {
            if !self.node_indices.contains_key(kind) {
                return Err(ResolutionError::UnknownKind { kind: kind.to_string() });
            }
            if position.insert(*kind, pos).is_some() {
                return Err(ResolutionError::InvalidProcessingOrder(format!(
                    "{} listed more than once",
                    kind
                )));
            }
        }

        let missing: Vec<String> = self
            .graph
            .node_weights()
            .filter(|k| !position.contains_key(*k))
            .map(|k| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ResolutionError::InvalidProcessingOrder(format!(
                "missing kind(s): {}",
                missing.join(", ")
            )));
        }

        for edge in self.graph.edge_references() {
            let child = self.graph[edge.source()];
            let parent = self.graph[edge.target()];
            if position[&parent] >= position[&child] {
                return Err(ResolutionError::InvalidProcessingOrder(format!(
                    "{} must come before {} (relation '{}')",
                    parent,
                    child,
                    edge.weight()
                )));
            }
        }

        Ok(())
    }

    /// Export the kind graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph KindGraph {\n");
        output.push_str("  rankdir=BT;\n");
        output.push_str("  node [shape=box, style=\"rounded\", fontname=\"Helvetica\"];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=9];\n\n");

        for kind in self.graph.node_weights() {
            output.push_str(&format!("  \"{}\";\n", kind));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                self.graph[edge.source()],
                self.graph[edge.target()],
                edge.weight()
            ));
        }

        output.push_str("}\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KindSchema;

    fn names(kinds: &[Kind]) -> Vec<&'static str> {
        kinds.iter().map(|k| k.name()).collect()
    }

    #[test]
    fn test_media_library_order() {
        let graph = KindGraph::from_registry(&SchemaRegistry::media_library());
        assert_eq!(graph.kind_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        let order = graph.topological_order().unwrap();
        assert_eq!(names(&order), vec!["Artist", "Album", "Track"]);
    }

    #[test]
    fn test_order_puts_parents_first() {
        let registry = SchemaRegistry::builder()
            .kind(KindSchema::new("Track").parent("AlbumId", "album", "Album"))
            .kind(KindSchema::new("Genre"))
            .kind(KindSchema::new("Album").parent("ArtistId", "artist", "Artist"))
            .kind(KindSchema::new("Artist"))
            .build()
            .unwrap();
        let graph = KindGraph::from_registry(&registry);
        let order = graph.topological_order().unwrap();
        assert_eq!(names(&order), vec!["Genre", "Artist", "Album", "Track"]);
    }

    #[test]
    fn test_parents_and_children() {
        let graph = KindGraph::from_registry(&SchemaRegistry::media_library());
        assert_eq!(names(&graph.parents_of(Kind::new("Track"))), vec!["Artist", "Album"]);
        assert_eq!(names(&graph.children_of(Kind::new("Artist"))), vec!["Album", "Track"]);
        assert!(graph.parents_of(Kind::new("Artist")).is_empty());
    }

    #[test]
    fn test_cycle_blocks_order() {
        let registry = SchemaRegistry::builder()
            .kind(KindSchema::new("A").parent("BId", "b", "B"))
            .kind(KindSchema::new("B").parent("AId", "a", "A"))
            .build()
            .unwrap();
        let graph = KindGraph::from_registry(&registry);
        match graph.topological_order() {
            Err(ResolutionError::CycleDetected { kinds }) => {
                assert_eq!(kinds, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("Expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_order() {
        let graph = KindGraph::from_registry(&SchemaRegistry::media_library());
        let artist = Kind::new("Artist");
        let album = Kind::new("Album");
        let track = Kind::new("Track");

        assert!(graph.validate_order(&[artist, album, track]).is_ok());
        assert!(matches!(
            graph.validate_order(&[album, artist, track]),
            Err(ResolutionError::InvalidProcessingOrder(_))
        ));
        assert!(matches!(
            graph.validate_order(&[artist, album]),
            Err(ResolutionError::InvalidProcessingOrder(_))
        ));
        assert!(matches!(
            graph.validate_order(&[artist, album, album, track]),
            Err(ResolutionError::InvalidProcessingOrder(_))
        ));
        assert!(matches!(
            graph.validate_order(&[artist, Kind::new("Genre"), album, track]),
            Err(ResolutionError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_to_dot() {
        let graph = KindGraph::from_registry(&SchemaRegistry::media_library());
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph KindGraph {"));
        assert!(dot.contains("\"Album\" -> \"Artist\" [label=\"artist\"];"));
        assert!(dot.contains("\"Track\" -> \"Album\" [label=\"album\"];"));
    }
}
