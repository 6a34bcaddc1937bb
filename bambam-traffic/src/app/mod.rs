mod traffic_app;

pub use traffic_app::{run_match, run_query, TrafficQueryResult};
