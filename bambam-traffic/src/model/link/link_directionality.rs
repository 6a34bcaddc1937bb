use super::TravelDirection;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// the directions a traffic link can be travelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirectionality {
    FromOnly,
    ToOnly,
    Both,
}

impl LinkDirectionality {
    /// decodes the `DIR_TRAVEL` code of a streets record: `B` (both), `F` (from
    /// reference node) or `T` (towards reference node).
    pub fn from_code(code: &str) -> Option<LinkDirectionality> {
        match code.trim() {
            "B" | "b" => Some(LinkDirectionality::Both),
            "F" | "f" => Some(LinkDirectionality::FromOnly),
            "T" | "t" => Some(LinkDirectionality::ToOnly),
            _ => None,
        }
    }

    pub fn allows(&self, direction: TravelDirection) -> bool {
        matches!(
            (self, direction),
            (LinkDirectionality::Both, _)
                | (LinkDirectionality::FromOnly, TravelDirection::From)
                | (LinkDirectionality::ToOnly, TravelDirection::To)
        )
    }
}

impl Display for LinkDirectionality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkDirectionality::FromOnly => write!(f, "from_only"),
            LinkDirectionality::ToOnly => write!(f, "to_only"),
            LinkDirectionality::Both => write!(f, "both"),
        }
    }
}
