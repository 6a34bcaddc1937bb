use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// direction of travel along a traffic link relative to its reference node.
/// `From` travels away from the reference node in digitization order, `To`
/// travels towards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    From,
    To,
}

impl TravelDirection {
    /// decodes the single-letter travel direction code used in pattern reference files.
    pub fn from_code(code: &str) -> Option<TravelDirection> {
        match code.trim() {
            "F" | "f" => Some(TravelDirection::From),
            "T" | "t" => Some(TravelDirection::To),
            _ => None,
        }
    }
}

impl Display for TravelDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TravelDirection::From => write!(f, "from"),
            TravelDirection::To => write!(f, "to"),
        }
    }
}
