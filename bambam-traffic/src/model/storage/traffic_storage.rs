use super::LookupEntry;
use crate::model::{link::PatternId, TrafficError};

/// persistence for traffic patterns and the edge to pattern lookup table.
pub trait TrafficStorage {
    /// stores the speed values of a pattern verbatim.
    fn set_traffic_pattern(
        &mut self,
        pattern_id: PatternId,
        values: &[u16],
    ) -> Result<(), TrafficError>;

    /// records a lookup entry. repeated writes for the same edge, orientation
    /// and weekday accumulate rather than being rejected.
    fn set_edge_traffic_pattern_lookup(&mut self, entry: &LookupEntry) -> Result<(), TrafficError>;

    /// true when a previous matching pass has completed against this storage.
    fn is_matched(&self) -> bool;

    fn set_matched(&mut self);

    /// durably commits everything written so far.
    fn flush(&mut self) -> Result<(), TrafficError>;
}
