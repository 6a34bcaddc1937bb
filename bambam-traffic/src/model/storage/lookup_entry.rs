use crate::model::{
    graph::{EdgeId, EdgeState, NodeId},
    link::PatternId,
};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// association between an oriented real graph edge, a weekday and the
/// traffic pattern observed on it, weighted by the matched length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub edge_id: EdgeId,
    pub base_node: NodeId,
    pub adj_node: NodeId,
    pub weekday: Weekday,
    pub pattern_id: PatternId,
    pub length: Length,
}

impl LookupEntry {
    pub fn new(
        edge: EdgeState,
        weekday: Weekday,
        pattern_id: PatternId,
        length: Length,
    ) -> LookupEntry {
        LookupEntry {
            edge_id: edge.edge_id,
            base_node: edge.base_node,
            adj_node: edge.adj_node,
            weekday,
            pattern_id,
            length,
        }
    }

    pub fn edge_state(&self) -> EdgeState {
        EdgeState::new(self.edge_id, self.base_node, self.adj_node)
    }
}
