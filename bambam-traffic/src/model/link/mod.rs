mod link_directionality;
mod link_id;
mod pattern_id;
mod traffic_link;
mod traffic_pattern;
mod travel_direction;
mod weekday_patterns;

pub use link_directionality::LinkDirectionality;
pub use link_id::LinkId;
pub use pattern_id::PatternId;
pub use traffic_link::TrafficLink;
pub use traffic_pattern::TrafficPattern;
pub use travel_direction::TravelDirection;
pub use weekday_patterns::{WeekdayPatterns, WEEKDAYS};
