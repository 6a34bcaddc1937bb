mod edge_id;
mod edge_reference;
mod edge_state;
mod graph_topology;
mod node_id;
mod road_graph;

pub use edge_id::EdgeId;
pub use edge_reference::EdgeReference;
pub use edge_state::EdgeState;
pub use graph_topology::GraphTopology;
pub use node_id::NodeId;
pub use road_graph::{EdgeRecord, RoadEdge, RoadGraph, VertexRecord};
