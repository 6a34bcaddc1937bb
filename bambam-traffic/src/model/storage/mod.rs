mod edge_orientation;
mod lookup_entry;
mod traffic_graph_storage;
mod traffic_storage;

pub use edge_orientation::EdgeOrientation;
pub use lookup_entry::LookupEntry;
pub use traffic_graph_storage::TrafficGraphStorage;
pub use traffic_storage::TrafficStorage;
