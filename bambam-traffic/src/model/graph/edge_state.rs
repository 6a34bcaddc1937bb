use super::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// a real graph edge viewed in one orientation, from `base_node` to `adj_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeState {
    pub edge_id: EdgeId,
    pub base_node: NodeId,
    pub adj_node: NodeId,
}

impl EdgeState {
    pub fn new(edge_id: EdgeId, base_node: NodeId, adj_node: NodeId) -> EdgeState {
        EdgeState {
            edge_id,
            base_node,
            adj_node,
        }
    }

    /// the same edge viewed in the opposite orientation.
    pub fn reversed(&self) -> EdgeState {
        EdgeState {
            edge_id: self.edge_id,
            base_node: self.adj_node,
            adj_node: self.base_node,
        }
    }
}

impl Display for EdgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "edge {} ({} -> {})",
            self.edge_id, self.base_node, self.adj_node
        )
    }
}
