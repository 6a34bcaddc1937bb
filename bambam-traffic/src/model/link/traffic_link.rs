use super::{LinkDirectionality, LinkId, PatternId, TravelDirection, WeekdayPatterns};
use chrono::Weekday;
use geo::{Haversine, Length, LineString};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length as Distance;

/// a road segment from an external traffic data provider along with the
/// traffic patterns observed on it for each direction of travel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficLink {
    pub link_id: LinkId,
    /// WGS84 geometry in digitization order, starting at the reference node
    pub geometry: LineString<f64>,
    pub directionality: LinkDirectionality,
    /// road importance category, 1 (major) to 5 (local)
    pub functional_class: u8,
    from_patterns: WeekdayPatterns,
    to_patterns: WeekdayPatterns,
}

impl TrafficLink {
    pub fn new(
        link_id: LinkId,
        geometry: LineString<f64>,
        directionality: LinkDirectionality,
        functional_class: u8,
    ) -> TrafficLink {
        TrafficLink {
            link_id,
            geometry,
            directionality,
            functional_class,
            from_patterns: WeekdayPatterns::new(),
            to_patterns: WeekdayPatterns::new(),
        }
    }

    pub fn is_both_directions(&self) -> bool {
        self.directionality == LinkDirectionality::Both
    }

    pub fn is_only_from_direction(&self) -> bool {
        self.directionality == LinkDirectionality::FromOnly
    }

    pub fn is_only_to_direction(&self) -> bool {
        self.directionality == LinkDirectionality::ToOnly
    }

    /// a link whose geometry collapses onto a single point or returns to its
    /// start cannot be matched in either direction.
    pub fn is_teardrop(&self) -> bool {
        let distinct = self.geometry.coords().dedup().count();
        distinct < 2 || self.geometry.is_closed()
    }

    /// the geometry to match when travelling in the given direction. `To`
    /// geometries run from the non-reference node back to the reference node.
    ///
    /// # Returns
    ///
    /// * `None` if the link cannot be travelled in this direction or is a teardrop
    pub fn geometry_for(&self, direction: TravelDirection) -> Option<LineString<f64>> {
        if !self.directionality.allows(direction) || self.is_teardrop() {
            return None;
        }
        match direction {
            TravelDirection::From => Some(self.geometry.clone()),
            TravelDirection::To => {
                let reversed = self.geometry.coords().rev().cloned().collect_vec();
                Some(LineString::new(reversed))
            }
        }
    }

    pub fn from_geometry(&self) -> Option<LineString<f64>> {
        self.geometry_for(TravelDirection::From)
    }

    pub fn to_geometry(&self) -> Option<LineString<f64>> {
        self.geometry_for(TravelDirection::To)
    }

    /// great-circle length of the link geometry.
    pub fn length(&self) -> Distance {
        let meters = Haversine.length(&self.geometry);
        Distance::new::<uom::si::length::meter>(meters)
    }

    pub fn traffic_pattern_ids(&self, direction: TravelDirection) -> &WeekdayPatterns {
        match direction {
            TravelDirection::From => &self.from_patterns,
            TravelDirection::To => &self.to_patterns,
        }
    }

    pub fn set_traffic_pattern_id(
        &mut self,
        direction: TravelDirection,
        weekday: Weekday,
        pattern_id: PatternId,
    ) -> Option<PatternId> {
        match direction {
            TravelDirection::From => self.from_patterns.insert(weekday, pattern_id),
            TravelDirection::To => self.to_patterns.insert(weekday, pattern_id),
        }
    }
}
