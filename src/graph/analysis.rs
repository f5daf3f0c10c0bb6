//! Kind Graph Analysis
//!
//! Finds strongly connected components in the kind graph. Any multi-member
//! component, or a kind that names itself as a parent, is a cycle and makes
//! the schema unusable for hierarchical resolution.

use petgraph::algo::kosaraju_scc;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use super::KindGraph;
use crate::error::ResolutionError;
use crate::schema::Kind;

/// A group of kinds whose parent relations loop back on themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCycle {
    /// Members in registration order
    pub members: Vec<Kind>,
    /// Single kind referencing itself
    pub is_self_referential: bool,
    /// Relations whose edges stay inside the cycle
    pub relations: Vec<(Kind, &'static str)>,
}

impl KindCycle {
    pub fn into_error(self) -> ResolutionError {
        ResolutionError::CycleDetected {
            kinds: self.members.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Compute all kind cycles, ordered by their first member's registration
pub fn find_cycles(graph: &KindGraph) -> Vec<KindCycle> {
    let mut cycles = Vec::new();

    for mut scc in kosaraju_scc(&graph.graph) {
        let is_self_referential = scc.len() == 1
            && graph
                .graph
                .edges_directed(scc[0], Direction::Outgoing)
                .any(|e| e.target() == scc[0]);

        if scc.len() == 1 && !is_self_referential {
            continue;
        }

        scc.sort();

        let mut relations = Vec::new();
        for &node in &scc {
            for edge in graph.graph.edges_directed(node, Direction::Outgoing) {
                if scc.contains(&edge.target()) {
                    relations.push((graph.graph[node], *edge.weight()));
                }
            }
        }

        cycles.push(KindCycle {
            members: scc.iter().map(|&n| graph.graph[n]).collect(),
            is_self_referential,
            relations,
        });
    }

    cycles.sort_by_key(|c| c.members.first().map(|k| graph.node_indices[k]));
    cycles
}
