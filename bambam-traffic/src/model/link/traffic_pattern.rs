use super::PatternId;
use serde::{Deserialize, Serialize};

/// a time-of-day speed profile shared by many traffic links. speeds are
/// stored in km/h, one value per equally sized time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficPattern {
    pub pattern_id: PatternId,
    pub values: Vec<u16>,
}

impl TrafficPattern {
    pub fn new(pattern_id: PatternId, values: Vec<u16>) -> TrafficPattern {
        TrafficPattern { pattern_id, values }
    }
}
