use super::TrafficError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafficCliError {
    #[error("failure reading run configuration: {0}")]
    ConfigurationError(String),
    #[error("invalid command line argument: {0}")]
    InvalidArgument(String),
    #[error("traffic matching failed: {source}")]
    TrafficError {
        #[from]
        source: TrafficError,
    },
    #[error("failure reading configuration: {source}")]
    StdIoError {
        #[from]
        source: std::io::Error,
    },
    #[error("failure encoding JSON: {source}")]
    SerdeJsonError {
        #[from]
        source: serde_json::Error,
    },
}
