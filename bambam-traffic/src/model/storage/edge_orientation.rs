use crate::model::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// the direction an edge is traversed in, independent of how the edge is
/// stored. `Forward` when the base node id is not greater than the adjacent node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrientation {
    Forward,
    Reverse,
}

impl EdgeOrientation {
    pub fn from_nodes(base_node: NodeId, adj_node: NodeId) -> EdgeOrientation {
        if base_node <= adj_node {
            EdgeOrientation::Forward
        } else {
            EdgeOrientation::Reverse
        }
    }
}

impl Display for EdgeOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeOrientation::Forward => write!(f, "forward"),
            EdgeOrientation::Reverse => write!(f, "reverse"),
        }
    }
}
