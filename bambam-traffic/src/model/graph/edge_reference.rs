use super::{EdgeId, EdgeState, NodeId};
use serde::{Deserialize, Serialize};

/// an edge as reported by a segment matcher. matching a geometry that starts
/// or ends in the middle of a graph edge produces `Virtual` edges which cover
/// part of an `original_edge_id` and have at least one virtual endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeReference {
    Real {
        edge_id: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
    },
    Virtual {
        original_edge_id: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
    },
}

impl EdgeReference {
    pub fn real(state: EdgeState) -> EdgeReference {
        EdgeReference::Real {
            edge_id: state.edge_id,
            base_node: state.base_node,
            adj_node: state.adj_node,
        }
    }

    pub fn base_node(&self) -> NodeId {
        match self {
            EdgeReference::Real { base_node, .. } => *base_node,
            EdgeReference::Virtual { base_node, .. } => *base_node,
        }
    }

    pub fn adj_node(&self) -> NodeId {
        match self {
            EdgeReference::Real { adj_node, .. } => *adj_node,
            EdgeReference::Virtual { adj_node, .. } => *adj_node,
        }
    }

    /// the id of the graph edge this reference lies on.
    pub fn underlying_edge_id(&self) -> EdgeId {
        match self {
            EdgeReference::Real { edge_id, .. } => *edge_id,
            EdgeReference::Virtual {
                original_edge_id, ..
            } => *original_edge_id,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, EdgeReference::Virtual { .. })
    }
}
