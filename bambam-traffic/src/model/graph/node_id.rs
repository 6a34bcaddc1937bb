use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// dense index of a node in the road graph. ids at or beyond the graph's node
/// count denote virtual nodes created while snapping a geometry mid-edge.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize, Hash,
)]
pub struct NodeId(pub usize);

impl NodeId {
    /// true when this id addresses a node stored in a graph with `node_count` nodes.
    pub fn is_real(&self, node_count: usize) -> bool {
        self.0 < node_count
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
