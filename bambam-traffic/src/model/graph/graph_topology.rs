use super::{EdgeId, EdgeState, NodeId};
use crate::model::TrafficError;
use geo::LineString;

/// read access to the road graph that traffic patterns are attached to.
pub trait GraphTopology {
    /// number of real nodes. any node id at or above this value is virtual.
    fn node_count(&self) -> usize;

    /// the state of a real edge oriented so that its adjacent node is `adj_node`.
    ///
    /// # Arguments
    ///
    /// * `edge_id`  - edge to look up
    /// * `adj_node` - one of the edge's endpoints, becomes the adjacent node of the result
    ///
    /// # Returns
    ///
    /// * the oriented edge, or an error if the edge is unknown or `adj_node` is not one of its endpoints
    fn edge_state(&self, edge_id: EdgeId, adj_node: NodeId) -> Result<EdgeState, TrafficError>;

    /// the geometry of an edge in its stored orientation, if the graph keeps geometries.
    fn edge_geometry(&self, _edge_id: EdgeId) -> Option<LineString<f64>> {
        None
    }

    /// number of real edges, used to enumerate geometries for diagnostics.
    fn edge_count(&self) -> usize {
        0
    }
}
