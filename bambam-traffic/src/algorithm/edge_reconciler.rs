use crate::model::{
    graph::{EdgeReference, EdgeState, GraphTopology},
    TrafficError,
};

/// maps an edge reported by the matcher onto a real graph edge.
///
/// real references are returned as-is. a virtual reference is resolved
/// through its original edge using whichever endpoint is real: a real
/// adjacent node keeps the orientation of the fetched edge state, a real
/// base node fetches the edge towards the base node and flips it back.
///
/// # Returns
///
/// * `None` when neither endpoint of a virtual reference is a real node
/// * an error when the topology does not know the edge or the node is not on it
pub fn resolve<G>(
    reference: &EdgeReference,
    topology: &G,
) -> Result<Option<EdgeState>, TrafficError>
where
    G: GraphTopology + ?Sized,
{
    match reference {
        EdgeReference::Real {
            edge_id,
            base_node,
            adj_node,
        } => Ok(Some(EdgeState::new(*edge_id, *base_node, *adj_node))),
        EdgeReference::Virtual {
            original_edge_id,
            base_node,
            adj_node,
        } => {
            let node_count = topology.node_count();
            if adj_node.is_real(node_count) {
                let state = topology.edge_state(*original_edge_id, *adj_node)?;
                Ok(Some(state))
            } else if base_node.is_real(node_count) {
                let state = topology.edge_state(*original_edge_id, *base_node)?;
                Ok(Some(state.reversed()))
            } else {
                Ok(None)
            }
        }
    }
}
