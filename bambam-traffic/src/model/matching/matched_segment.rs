use crate::model::graph::EdgeReference;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// one edge of a matched segment along with the length of the portion of
/// that edge covered by the match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedEdge {
    pub reference: EdgeReference,
    pub distance: Length,
}

impl MatchedEdge {
    pub fn new(reference: EdgeReference, distance: Length) -> MatchedEdge {
        MatchedEdge {
            reference,
            distance,
        }
    }
}

/// an ordered run of graph edges that corresponds to a queried geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedSegment {
    pub edges: Vec<MatchedEdge>,
}

impl MatchedSegment {
    pub fn new(edges: Vec<MatchedEdge>) -> MatchedSegment {
        MatchedSegment { edges }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }
}
