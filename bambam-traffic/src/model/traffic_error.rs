use thiserror::Error;

use super::graph::{EdgeId, NodeId};

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("invalid traffic matching configuration: {0}")]
    ConfigurationError(String),
    #[error("required traffic matching parameter '{0}' is not set")]
    MissingParameter(String),
    #[error("failure reading file {0}: {1}")]
    CsvReadError(String, csv::Error),
    #[error("failure writing to file {0}: {1}")]
    CsvWriteError(String, csv::Error),
    #[error("invalid record in {0}: {1}")]
    InvalidRecord(String, String),
    #[error("unable to deserialize WKT into geometry: {0}")]
    InvalidWKT(String),
    #[error("attempting to get edge '{0}' not in graph")]
    GraphMissingEdgeId(EdgeId),
    #[error("attempting to get node '{0}' not in graph")]
    GraphMissingNodeId(NodeId),
    #[error("node '{1}' is not an endpoint of edge '{0}'")]
    NodeNotOnEdge(EdgeId, NodeId),
    #[error("failure matching geometry: {0}")]
    MatchingError(String),
    #[error("traffic storage failure: {0}")]
    StorageError(String),
    #[error("failure writing diagnostics: {0}")]
    DiagnosticsError(String),
    #[error("file system failure: {source}")]
    StdIoError {
        #[from]
        source: std::io::Error,
    },
    #[error("failure encoding or decoding JSON: {source}")]
    SerdeJsonError {
        #[from]
        source: serde_json::Error,
    },
}
