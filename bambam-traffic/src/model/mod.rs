pub mod graph;
pub mod link;
pub mod matching;
pub mod source;
pub mod storage;
mod traffic_cli_error;
mod traffic_error;

pub use traffic_cli_error::TrafficCliError;
pub use traffic_error::TrafficError;
