use super::MatchedSegment;
use crate::model::TrafficError;
use geo::LineString;
use uom::si::f64::Length;

/// snaps a polyline onto the edges of a road graph.
pub trait SegmentMatcher {
    /// finds the graph edges corresponding to a geometry.
    ///
    /// # Arguments
    ///
    /// * `geometry`         - WGS84 polyline in travel order
    /// * `nominal_length`   - great-circle length of the source link
    /// * `functional_class` - road importance category of the source link
    /// * `both_directions`  - when false, matched edges follow the travel order of `geometry`
    /// * `search_radius`    - maximum distance between the geometry and a matched edge
    ///
    /// # Returns
    ///
    /// * zero or more matched segments, empty when nothing lies within the search radius
    fn match_segments(
        &self,
        geometry: &LineString<f64>,
        nominal_length: Length,
        functional_class: u8,
        both_directions: bool,
        search_radius: Length,
    ) -> Result<Vec<MatchedSegment>, TrafficError>;
}
