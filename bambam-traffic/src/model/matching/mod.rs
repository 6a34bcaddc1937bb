mod matched_segment;
mod nearest_edge_matcher;
mod segment_matcher;

pub use matched_segment::{MatchedEdge, MatchedSegment};
pub use nearest_edge_matcher::NearestEdgeMatcher;
pub use segment_matcher::SegmentMatcher;
