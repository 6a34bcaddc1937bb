use super::{
    edge_reconciler,
    link_processor::{LinkMatch, LinkProcessor},
    matching_diagnostics::MatchingDiagnostics,
    pattern_lookup,
};
use crate::model::{
    graph::GraphTopology, matching::SegmentMatcher, source::TrafficSource,
    storage::TrafficStorage, TrafficError,
};
use kdam::tqdm;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uom::si::f64::Length;

/// progress of the one-time matching pass against a storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingState {
    Unmatched,
    Matching,
    Matched,
}

impl Display for MatchingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchingState::Unmatched => write!(f, "unmatched"),
            MatchingState::Matching => write!(f, "matching"),
            MatchingState::Matched => write!(f, "matched"),
        }
    }
}

/// counts reported at the end of a matching pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSummary {
    /// true when the storage was matched before this pass began
    pub already_matched: bool,
    pub patterns_stored: usize,
    pub links_processed: usize,
    pub links_matched: usize,
    pub segments_matched: usize,
    pub entries_written: usize,
    pub virtual_edges_skipped: usize,
    pub resolution_failures: usize,
}

impl Display for MatchingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.already_matched {
            return write!(f, "traffic patterns already matched, nothing to do");
        }
        write!(
            f,
            "stored {} patterns; matched {} of {} links onto {} segments; wrote {} lookup entries; skipped {} virtual edges; {} edges failed to resolve",
            self.patterns_stored,
            self.links_matched,
            self.links_processed,
            self.segments_matched,
            self.entries_written,
            self.virtual_edges_skipped,
            self.resolution_failures
        )
    }
}

/// runs the matching pass that attaches traffic patterns to graph edges.
pub struct TrafficMatching<'a, M, G>
where
    M: SegmentMatcher + ?Sized,
    G: GraphTopology + ?Sized,
{
    matcher: &'a M,
    topology: &'a G,
    search_radius: Length,
    state: MatchingState,
}

impl<'a, M, G> TrafficMatching<'a, M, G>
where
    M: SegmentMatcher + ?Sized,
    G: GraphTopology + ?Sized,
{
    pub fn new(matcher: &'a M, topology: &'a G, search_radius: Length) -> Self {
        TrafficMatching {
            matcher,
            topology,
            search_radius,
            state: MatchingState::Unmatched,
        }
    }

    pub fn state(&self) -> MatchingState {
        self.state
    }

    /// matches every link of the source onto the graph and records the
    /// resulting lookup entries, unless the storage reports that this was
    /// already done. links are taken out of the source as they are processed
    /// unless diagnostics are collected.
    pub fn run<T, S>(
        &mut self,
        source: &mut T,
        storage: &mut S,
        mut diagnostics: Option<&mut MatchingDiagnostics>,
    ) -> Result<MatchingSummary, TrafficError>
    where
        T: TrafficSource + ?Sized,
        S: TrafficStorage + ?Sized,
    {
        if storage.is_matched() {
            log::info!("traffic patterns are already matched to the graph, skipping");
            self.state = MatchingState::Matched;
            return Ok(MatchingSummary {
                already_matched: true,
                ..Default::default()
            });
        }
        self.state = MatchingState::Matching;
        let mut summary = MatchingSummary::default();

        log::info!("  (((1))) storing traffic patterns");
        summary.patterns_stored = pattern_lookup::preload_patterns(&*source, storage)?;

        log::info!("  (((2))) matching traffic links");
        let processor = LinkProcessor::new(self.matcher, self.search_radius);
        let link_ids = source.link_ids();
        for link_id in tqdm!(link_ids.iter(), desc = "match traffic links") {
            let link_match = match diagnostics.as_deref_mut() {
                None => {
                    let link = source.take_link(*link_id);
                    processor.process_link(link.as_ref())
                }
                Some(d) => {
                    let link = source.link(*link_id);
                    let link_match = processor.process_link(link);
                    if let Some(link) = link {
                        d.add_link(link, &link_match);
                    }
                    link_match
                }
            };
            self.record_link_match(
                &link_match,
                storage,
                diagnostics.as_deref_mut(),
                &mut summary,
            )?;
        }
        eprintln!();

        log::info!("  (((3))) committing traffic storage");
        storage.set_matched();
        storage.flush()?;
        self.state = MatchingState::Matched;
        log::info!("{summary}");
        Ok(summary)
    }

    /// resolves the matched edges of a link and writes one lookup entry per
    /// resolved edge and weekday. edges that cannot be resolved are skipped.
    fn record_link_match<S>(
        &self,
        link_match: &LinkMatch,
        storage: &mut S,
        mut diagnostics: Option<&mut MatchingDiagnostics>,
        summary: &mut MatchingSummary,
    ) -> Result<(), TrafficError>
    where
        S: TrafficStorage + ?Sized,
    {
        if link_match.link_id.is_none() {
            return Ok(());
        }
        summary.links_processed += 1;
        if link_match.is_matched() {
            summary.links_matched += 1;
        }
        for direction in link_match.directions.iter() {
            summary.segments_matched += direction.segments.len();
            let matched_edges = direction.segments.iter().flat_map(|s| s.edges.iter());
            for matched_edge in matched_edges {
                let edge = match edge_reconciler::resolve(&matched_edge.reference, self.topology)
                {
                    Ok(Some(edge)) => edge,
                    Ok(None) => {
                        summary.virtual_edges_skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        log::warn!(
                            "link {:?} {} direction: unable to resolve {:?}: {}",
                            link_match.link_id,
                            direction.direction,
                            matched_edge.reference,
                            e
                        );
                        summary.resolution_failures += 1;
                        continue;
                    }
                };
                let entries = pattern_lookup::lookup_entries(
                    edge,
                    &direction.patterns,
                    matched_edge.distance,
                );
                summary.entries_written += pattern_lookup::commit(storage, entries)?;
                if let Some(d) = diagnostics.as_deref_mut() {
                    d.add_matched_edge(link_match.link_id, &edge);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        graph::{EdgeId, EdgeReference, EdgeState, NodeId},
        link::{
            LinkDirectionality, LinkId, PatternId, TrafficLink, TrafficPattern, TravelDirection,
        },
        matching::{MatchedEdge, MatchedSegment},
        source::HereTrafficData,
        storage::{LookupEntry, TrafficGraphStorage},
    };
    use chrono::Weekday;
    use geo::{line_string, LineString};
    use std::cell::Cell;

    fn meters(value: f64) -> Length {
        Length::new::<uom::si::length::meter>(value)
    }

    fn real(edge_id: usize, base: usize, adj: usize, distance: f64) -> MatchedEdge {
        MatchedEdge::new(
            EdgeReference::Real {
                edge_id: EdgeId(edge_id),
                base_node: NodeId(base),
                adj_node: NodeId(adj),
            },
            meters(distance),
        )
    }

    /// matches geometries starting at x = 0 onto edges 50 and 51, and all
    /// others onto edge 52
    #[derive(Default)]
    struct MockMatcher {
        calls: Cell<usize>,
    }

    impl SegmentMatcher for MockMatcher {
        fn match_segments(
            &self,
            geometry: &LineString<f64>,
            _nominal_length: Length,
            _functional_class: u8,
            _both_directions: bool,
            _search_radius: Length,
        ) -> Result<Vec<MatchedSegment>, TrafficError> {
            self.calls.set(self.calls.get() + 1);
            if geometry.0[0].x == 0.0 {
                Ok(vec![MatchedSegment::new(vec![
                    real(50, 1, 2, 60.0),
                    real(51, 2, 3, 45.0),
                ])])
            } else {
                Ok(vec![MatchedSegment::new(vec![real(52, 3, 1, 105.0)])])
            }
        }
    }

    /// a graph where nodes 0..10 are real and every edge runs from its id
    /// modulo 10 to the next node
    struct MockTopology;

    impl GraphTopology for MockTopology {
        fn node_count(&self) -> usize {
            10
        }

        fn edge_state(
            &self,
            edge_id: EdgeId,
            adj_node: NodeId,
        ) -> Result<EdgeState, TrafficError> {
            let src = NodeId(edge_id.0 % 10);
            let dst = NodeId((edge_id.0 + 1) % 10);
            if adj_node == dst {
                Ok(EdgeState::new(edge_id, src, dst))
            } else if adj_node == src {
                Ok(EdgeState::new(edge_id, dst, src))
            } else {
                Err(TrafficError::NodeNotOnEdge(edge_id, adj_node))
            }
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        matched: bool,
        patterns: Vec<PatternId>,
        entries: Vec<LookupEntry>,
        flushes: usize,
    }

    impl TrafficStorage for RecordingStorage {
        fn set_traffic_pattern(
            &mut self,
            pattern_id: PatternId,
            _values: &[u16],
        ) -> Result<(), TrafficError> {
            self.patterns.push(pattern_id);
            Ok(())
        }

        fn set_edge_traffic_pattern_lookup(
            &mut self,
            entry: &LookupEntry,
        ) -> Result<(), TrafficError> {
            self.entries.push(*entry);
            Ok(())
        }

        fn is_matched(&self) -> bool {
            self.matched
        }

        fn set_matched(&mut self) {
            self.matched = true;
        }

        fn flush(&mut self) -> Result<(), TrafficError> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn source() -> HereTrafficData {
        let mut link = TrafficLink::new(
            LinkId(1001),
            line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)],
            LinkDirectionality::Both,
            3,
        );
        link.set_traffic_pattern_id(TravelDirection::From, Weekday::Mon, PatternId(77));
        link.set_traffic_pattern_id(TravelDirection::To, Weekday::Mon, PatternId(88));
        let mut data = HereTrafficData::new();
        data.add_link(link);
        data.add_pattern(TrafficPattern::new(PatternId(77), vec![50; 96]));
        data.add_pattern(TrafficPattern::new(PatternId(88), vec![30; 96]));
        data
    }

    #[test]
    fn test_end_to_end_lookup_entries() {
        let matcher = MockMatcher::default();
        let topology = MockTopology;
        let mut matching = TrafficMatching::new(&matcher, &topology, meters(200.0));
        let mut source = source();
        let mut storage = RecordingStorage::default();
        assert_eq!(matching.state(), MatchingState::Unmatched);

        let summary = matching
            .run(&mut source, &mut storage, None)
            .expect("matching pass");

        assert_eq!(matching.state(), MatchingState::Matched);
        assert_eq!(matcher.calls.get(), 2);
        let result: Vec<(EdgeId, Weekday, PatternId, f64)> = storage
            .entries
            .iter()
            .map(|e| {
                (
                    e.edge_id,
                    e.weekday,
                    e.pattern_id,
                    e.length.get::<uom::si::length::meter>(),
                )
            })
            .collect();
        assert_eq!(
            result,
            vec![
                (EdgeId(50), Weekday::Mon, PatternId(77), 60.0),
                (EdgeId(51), Weekday::Mon, PatternId(77), 45.0),
                (EdgeId(52), Weekday::Mon, PatternId(88), 105.0),
            ]
        );
        assert_eq!(summary.entries_written, 3);
        assert_eq!(summary.links_processed, 1);
        assert_eq!(summary.links_matched, 1);
        assert_eq!(summary.segments_matched, 2);
        assert_eq!(storage.patterns, vec![PatternId(77), PatternId(88)]);
        assert!(storage.matched);
        assert_eq!(storage.flushes, 1);
        // without diagnostics the link is released from the source
        assert!(source.link_ids().is_empty());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let matcher = MockMatcher::default();
        let topology = MockTopology;
        let mut source = source();
        let mut storage = TrafficGraphStorage::in_memory();

        let first = TrafficMatching::new(&matcher, &topology, meters(200.0))
            .run(&mut source, &mut storage, None)
            .expect("first pass");
        assert!(!first.already_matched);
        assert_eq!(matcher.calls.get(), 2);

        let mut source = self::source();
        let second = TrafficMatching::new(&matcher, &topology, meters(200.0))
            .run(&mut source, &mut storage, None)
            .expect("second pass");
        assert!(second.already_matched);
        assert_eq!(second.entries_written, 0);
        assert_eq!(matcher.calls.get(), 2);
        assert_eq!(storage.n_lookup_writes(), 3);
        assert_eq!(
            storage.get_edge_traffic_pattern(EdgeId(52), NodeId(3), NodeId(1), Weekday::Mon),
            Some(PatternId(88))
        );
    }

    #[test]
    fn test_virtual_edges_resolved_or_skipped() {
        struct VirtualMatcher;
        impl SegmentMatcher for VirtualMatcher {
            fn match_segments(
                &self,
                _geometry: &LineString<f64>,
                _nominal_length: Length,
                _functional_class: u8,
                _both_directions: bool,
                _search_radius: Length,
            ) -> Result<Vec<MatchedSegment>, TrafficError> {
                let edges = vec![
                    // real adjacent node 5 on edge 4 (4 -> 5)
                    MatchedEdge::new(
                        EdgeReference::Virtual {
                            original_edge_id: EdgeId(4),
                            base_node: NodeId(20),
                            adj_node: NodeId(5),
                        },
                        meters(10.0),
                    ),
                    // no real endpoint
                    MatchedEdge::new(
                        EdgeReference::Virtual {
                            original_edge_id: EdgeId(5),
                            base_node: NodeId(20),
                            adj_node: NodeId(21),
                        },
                        meters(5.0),
                    ),
                    // node 9 is not on edge 5
                    MatchedEdge::new(
                        EdgeReference::Virtual {
                            original_edge_id: EdgeId(5),
                            base_node: NodeId(21),
                            adj_node: NodeId(9),
                        },
                        meters(5.0),
                    ),
                ];
                Ok(vec![MatchedSegment::new(edges)])
            }
        }

        let mut source = HereTrafficData::new();
        let mut link = TrafficLink::new(
            LinkId(7),
            line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)],
            LinkDirectionality::FromOnly,
            2,
        );
        link.set_traffic_pattern_id(TravelDirection::From, Weekday::Fri, PatternId(1));
        source.add_link(link);
        let mut storage = RecordingStorage::default();
        let summary = TrafficMatching::new(&VirtualMatcher, &MockTopology, meters(200.0))
            .run(&mut source, &mut storage, None)
            .expect("matching pass");

        assert_eq!(summary.entries_written, 1);
        assert_eq!(summary.virtual_edges_skipped, 1);
        assert_eq!(summary.resolution_failures, 1);
        assert_eq!(
            storage.entries[0].edge_state(),
            EdgeState::new(EdgeId(4), NodeId(4), NodeId(5))
        );
    }

    #[test]
    fn test_diagnostics_keep_links_in_source() {
        let matcher = MockMatcher::default();
        let topology = MockTopology;
        let mut source = source();
        let mut storage = RecordingStorage::default();
        let mut diagnostics = MatchingDiagnostics::new(&std::env::temp_dir(), meters(200.0));
        TrafficMatching::new(&matcher, &topology, meters(200.0))
            .run(&mut source, &mut storage, Some(&mut diagnostics))
            .expect("matching pass");
        assert_eq!(source.link_ids(), vec![LinkId(1001)]);
        assert_eq!(diagnostics.n_traffic_links(), 1);
        assert_eq!(diagnostics.n_matched_links(), 1);
        assert_eq!(diagnostics.n_matched_edges(), 3);
    }

    #[test]
    fn test_empty_pattern_does_not_stop_matching() {
        let directory = std::env::temp_dir().join(format!(
            "bambam-traffic-empty-pattern-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&directory);
        let matcher = MockMatcher::default();
        let topology = MockTopology;
        let mut matching = TrafficMatching::new(&matcher, &topology, meters(200.0));
        let mut source = source();
        source.add_pattern(TrafficPattern::new(PatternId(99), vec![]));
        let mut storage = TrafficGraphStorage::create(&directory).expect("storage directory");

        let summary = matching
            .run(&mut source, &mut storage, None)
            .expect("matching pass");

        assert_eq!(summary.patterns_stored, 3);
        assert_eq!(summary.links_matched, 1);
        assert_eq!(summary.entries_written, 3);
        assert!(storage.is_matched());

        let reopened = TrafficGraphStorage::open(&directory).expect("flushed storage");
        assert!(reopened.is_matched());
        assert_eq!(reopened.n_patterns(), 3);
        assert_eq!(reopened.get_traffic_pattern(PatternId(99)), Some(&[] as &[u16]));
        assert_eq!(
            reopened.get_edge_traffic_pattern(EdgeId(50), NodeId(1), NodeId(2), Weekday::Mon),
            Some(PatternId(77))
        );
        let _ = std::fs::remove_dir_all(&directory);
    }
}
