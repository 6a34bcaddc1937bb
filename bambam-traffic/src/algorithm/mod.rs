pub mod edge_reconciler;
pub mod link_processor;
pub mod matching_diagnostics;
pub mod pattern_lookup;
pub mod traffic_matching;

pub use link_processor::{DirectionMatch, LinkMatch, LinkProcessor};
pub use matching_diagnostics::MatchingDiagnostics;
pub use traffic_matching::{MatchingState, MatchingSummary, TrafficMatching};
