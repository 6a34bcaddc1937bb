use crate::model::{
    link::{LinkId, TrafficLink, TravelDirection, WeekdayPatterns},
    matching::{MatchedSegment, SegmentMatcher},
};
use uom::si::f64::Length;

/// the segments matched for one travel direction of a link, paired with the
/// weekday patterns observed in that direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionMatch {
    pub direction: TravelDirection,
    pub segments: Vec<MatchedSegment>,
    pub patterns: WeekdayPatterns,
}

/// result of matching a single traffic link onto the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMatch {
    pub link_id: Option<LinkId>,
    pub directions: Vec<DirectionMatch>,
}

impl LinkMatch {
    pub fn n_segments(&self) -> usize {
        self.directions.iter().map(|d| d.segments.len()).sum()
    }

    /// true if any direction matched at least one graph edge.
    pub fn is_matched(&self) -> bool {
        self.directions
            .iter()
            .flat_map(|d| d.segments.iter())
            .any(|s| !s.is_empty())
    }
}

/// matches each travelable direction of a traffic link with a segment matcher.
pub struct LinkProcessor<'a, M: SegmentMatcher + ?Sized> {
    matcher: &'a M,
    search_radius: Length,
}

impl<'a, M: SegmentMatcher + ?Sized> LinkProcessor<'a, M> {
    pub fn new(matcher: &'a M, search_radius: Length) -> LinkProcessor<'a, M> {
        LinkProcessor {
            matcher,
            search_radius,
        }
    }

    /// matches a link in every direction it can be travelled. each direction
    /// is matched on its own, so a failure in one never affects the other.
    /// an absent link produces an empty result.
    pub fn process_link(&self, link: Option<&TrafficLink>) -> LinkMatch {
        let link = match link {
            Some(link) => link,
            None => return LinkMatch::default(),
        };
        let directions = if link.is_both_directions() {
            vec![TravelDirection::From, TravelDirection::To]
        } else if link.is_only_from_direction() {
            vec![TravelDirection::From]
        } else if link.is_only_to_direction() {
            vec![TravelDirection::To]
        } else {
            vec![]
        };
        let length = link.length();
        let directions = directions
            .into_iter()
            .map(|direction| DirectionMatch {
                direction,
                segments: self.match_direction(link, direction, length),
                patterns: link.traffic_pattern_ids(direction).clone(),
            })
            .collect();
        LinkMatch {
            link_id: Some(link.link_id),
            directions,
        }
    }

    fn match_direction(
        &self,
        link: &TrafficLink,
        direction: TravelDirection,
        length: Length,
    ) -> Vec<MatchedSegment> {
        let geometry = match link.geometry_for(direction) {
            Some(g) => g,
            None => {
                log::debug!(
                    "link {} has no {} geometry, skipping direction",
                    link.link_id,
                    direction
                );
                return vec![];
            }
        };
        match self.matcher.match_segments(
            &geometry,
            length,
            link.functional_class,
            false,
            self.search_radius,
        ) {
            Ok(segments) => segments,
            Err(e) => {
                log::warn!(
                    "failed matching link {} in {} direction: {}",
                    link.link_id,
                    direction,
                    e
                );
                vec![]
            }
        }
    }
}
