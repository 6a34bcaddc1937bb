use super::{MatchedEdge, MatchedSegment, SegmentMatcher};
use crate::model::{
    graph::{EdgeId, EdgeReference, EdgeState, NodeId, RoadEdge, RoadGraph},
    TrafficError,
};
use geo::{line_measures::Densifiable, Coord, Distance, Haversine, LineLocatePoint, LineString, Point};
use kdam::tqdm;
use rstar::{
    primitives::{GeomWithData, Line},
    RTree,
};
use uom::si::f64::Length;

/// a straight section of an edge geometry, tagged with its edge id.
pub type EdgeSection = GeomWithData<Line<[f64; 2]>, EdgeId>;

/// query geometries are densified to this spacing so that short graph edges
/// between two traffic shape points are still visited.
const DENSIFY_STEP_METERS: f64 = 10.0;

/// fractions this close to 0 or 1 are treated as lying on the edge's endpoint.
const ENDPOINT_TOLERANCE: f64 = 1e-3;

/// matched segments longer than this multiple of the nominal link length
/// (plus twice the search radius) are rejected as implausible.
const MAX_LENGTH_RATIO: f64 = 3.0;

/// a matcher that snaps each point of a densified geometry onto its nearest
/// graph edge. matches that begin or end in the middle of an edge produce
/// virtual edges whose mid-edge endpoints are numbered from the graph's node count.
///
/// candidates are not weighed by functional class.
pub struct NearestEdgeMatcher<'a> {
    graph: &'a RoadGraph,
    rtree: RTree<EdgeSection>,
}

/// location of a query point on an edge, as a fraction of the edge's natural orientation
#[derive(Debug, Clone, Copy)]
struct Snap {
    edge_id: EdgeId,
    fraction: f64,
}

/// a run of consecutive query points snapped onto the same edge
#[derive(Debug, Clone, Copy)]
struct Run {
    edge_id: EdgeId,
    start: f64,
    end: f64,
}

impl<'a> NearestEdgeMatcher<'a> {
    pub fn new(graph: &'a RoadGraph) -> Result<NearestEdgeMatcher<'a>, TrafficError> {
        let mut sections: Vec<EdgeSection> = vec![];
        let iter = tqdm!(
            graph.edges(),
            total = graph.n_edges(),
            desc = "build edge spatial index"
        );
        for edge in iter {
            let linestring = graph.edge_linestring(edge.edge_id)?;
            for line in linestring.lines() {
                let section = Line::new([line.start.x, line.start.y], [line.end.x, line.end.y]);
                sections.push(GeomWithData::new(section, edge.edge_id));
            }
        }
        eprintln!();
        let rtree = RTree::bulk_load(sections);
        Ok(NearestEdgeMatcher { graph, rtree })
    }

    /// snaps a coordinate onto the nearest edge within the search radius.
    fn snap(&self, coord: Coord<f64>, radius_meters: f64) -> Result<Option<Snap>, TrafficError> {
        let query = [coord.x, coord.y];
        let nearest = match self.rtree.nearest_neighbor(&query) {
            Some(n) => n,
            None => return Ok(None),
        };
        let projected = nearest.geom().nearest_point(&query);
        let projected_point = Point::new(projected[0], projected[1]);
        let distance = Haversine.distance(Point::from(coord), projected_point);
        if distance > radius_meters {
            return Ok(None);
        }
        let linestring = self.graph.edge_linestring(nearest.data)?;
        let fraction = linestring
            .line_locate_point(&projected_point)
            .unwrap_or_default();
        Ok(Some(self.canonical(nearest.data, fraction)?))
    }

    /// directed graphs store each two-way road as a pair of twin edges with
    /// identical geometry. runs are collected on the lower id of the pair so
    /// that alternating snaps between twins do not break a run.
    fn canonical(&self, edge_id: EdgeId, fraction: f64) -> Result<Snap, TrafficError> {
        let edge = self.graph.get_edge(edge_id)?;
        match self.graph.find_edge(edge.dst, edge.src) {
            Some(twin) if twin < edge_id && edge.src != edge.dst => Ok(Snap {
                edge_id: twin,
                fraction: 1.0 - fraction,
            }),
            _ => Ok(Snap { edge_id, fraction }),
        }
    }

    /// collapses snaps into runs, splitting into separate groups wherever
    /// consecutive runs do not share a node.
    fn build_runs(&self, snaps: &[Snap]) -> Result<Vec<Vec<Run>>, TrafficError> {
        let mut runs: Vec<Run> = vec![];
        for snap in snaps {
            match runs.last_mut() {
                Some(run) if run.edge_id == snap.edge_id => run.end = snap.fraction,
                _ => runs.push(Run {
                    edge_id: snap.edge_id,
                    start: snap.fraction,
                    end: snap.fraction,
                }),
            }
        }

        // interior runs that only touch an edge at one of its endpoints are
        // artifacts of snapping at an intersection
        let n_runs = runs.len();
        let runs = runs
            .into_iter()
            .enumerate()
            .filter(|(index, run)| {
                let interior = *index > 0 && *index + 1 < n_runs;
                !(interior && touches_endpoint_only(run))
            })
            .map(|(_, run)| run)
            .collect::<Vec<_>>();

        let mut groups: Vec<Vec<Run>> = vec![];
        let mut previous: Option<&RoadEdge> = None;
        for run in runs.iter() {
            let edge = self.graph.get_edge(run.edge_id)?;
            let connected = previous
                .map(|p| shared_node(p, edge).is_some())
                .unwrap_or_default();
            match groups.last_mut() {
                Some(group) if connected => group.push(*run),
                _ => groups.push(vec![*run]),
            }
            previous = Some(edge);
        }
        Ok(groups)
    }

    /// converts a connected group of runs into a matched segment with edges
    /// in travel order.
    fn build_segment(
        &self,
        runs: &[Run],
        both_directions: bool,
        next_virtual_node: &mut usize,
    ) -> Result<MatchedSegment, TrafficError> {
        let mut matched = vec![];
        let last = runs.len().saturating_sub(1);
        for (index, run) in runs.iter().enumerate() {
            let edge = self.graph.get_edge(run.edge_id)?;
            let entry = match index {
                0 => None,
                _ => shared_node(self.graph.get_edge(runs[index - 1].edge_id)?, edge),
            };
            let exit = match index {
                i if i == last => None,
                _ => shared_node(edge, self.graph.get_edge(runs[index + 1].edge_id)?),
            };
            let forward = match (entry, exit) {
                (Some(n), _) => n == edge.src,
                (None, Some(m)) => m == edge.dst,
                (None, None) => run.start <= run.end,
            };

            let from = if index == 0 {
                run.start
            } else if forward {
                0.0
            } else {
                1.0
            };
            let to = if index == last {
                run.end
            } else if forward {
                1.0
            } else {
                0.0
            };
            if (to - from).abs() < ENDPOINT_TOLERANCE {
                continue;
            }
            let distance = edge.distance * (to - from).abs();

            // travel against the natural orientation uses the twin edge when the
            // graph stores one, so that directed matches land on the right edge id
            let edge_id = match (both_directions, forward) {
                (false, false) => self.graph.find_edge(edge.dst, edge.src).unwrap_or(edge.edge_id),
                _ => edge.edge_id,
            };

            let base_node = node_at(edge, from).unwrap_or_else(|| {
                *next_virtual_node += 1;
                NodeId(*next_virtual_node - 1)
            });
            let adj_node = node_at(edge, to).unwrap_or_else(|| {
                *next_virtual_node += 1;
                NodeId(*next_virtual_node - 1)
            });
            let node_count = self.graph.n_vertices();
            let reference = if base_node.is_real(node_count) && adj_node.is_real(node_count) {
                EdgeReference::real(EdgeState::new(edge_id, base_node, adj_node))
            } else {
                EdgeReference::Virtual {
                    original_edge_id: edge_id,
                    base_node,
                    adj_node,
                }
            };
            matched.push(MatchedEdge::new(reference, distance));
        }
        Ok(MatchedSegment::new(matched))
    }
}

impl SegmentMatcher for NearestEdgeMatcher<'_> {
    fn match_segments(
        &self,
        geometry: &LineString<f64>,
        nominal_length: Length,
        _functional_class: u8,
        both_directions: bool,
        search_radius: Length,
    ) -> Result<Vec<MatchedSegment>, TrafficError> {
        if geometry.0.len() < 2 {
            return Err(TrafficError::MatchingError(format!(
                "geometry must have at least two coordinates, found {}",
                geometry.0.len()
            )));
        }
        let radius_meters = search_radius.get::<uom::si::length::meter>();
        let densified = geometry.densify(&Haversine, DENSIFY_STEP_METERS);
        let n_coords = densified.0.len();

        let mut snaps = vec![];
        for (index, coord) in densified.coords().enumerate() {
            match self.snap(*coord, radius_meters)? {
                Some(snap) => snaps.push(snap),
                None if index == 0 || index + 1 == n_coords => {
                    log::debug!(
                        "geometry endpoint ({}, {}) has no edge within {} meters",
                        coord.x,
                        coord.y,
                        radius_meters
                    );
                    return Ok(vec![]);
                }
                None => {}
            }
        }

        let max_length = nominal_length * MAX_LENGTH_RATIO + search_radius * 2.0;
        let mut next_virtual_node = self.graph.n_vertices();
        let mut segments = vec![];
        for runs in self.build_runs(&snaps)? {
            let segment = self.build_segment(&runs, both_directions, &mut next_virtual_node)?;
            if segment.is_empty() {
                continue;
            }
            let total = segment
                .edges
                .iter()
                .fold(Length::new::<uom::si::length::meter>(0.0), |acc, e| {
                    acc + e.distance
                });
            if total > max_length {
                log::debug!(
                    "rejecting matched segment of {:.1} meters for a link of {:.1} meters",
                    total.get::<uom::si::length::meter>(),
                    nominal_length.get::<uom::si::length::meter>()
                );
                continue;
            }
            segments.push(segment);
        }
        Ok(segments)
    }
}

/// the node shared by two edges, if they are adjacent.
fn shared_node(a: &RoadEdge, b: &RoadEdge) -> Option<NodeId> {
    [a.src, a.dst]
        .into_iter()
        .find(|n| *n == b.src || *n == b.dst)
}

/// the real node at a fractional position along an edge, if the position
/// coincides with one of its endpoints.
fn node_at(edge: &RoadEdge, fraction: f64) -> Option<NodeId> {
    if fraction <= ENDPOINT_TOLERANCE {
        Some(edge.src)
    } else if fraction >= 1.0 - ENDPOINT_TOLERANCE {
        Some(edge.dst)
    } else {
        None
    }
}

fn touches_endpoint_only(run: &Run) -> bool {
    let at_start = run.start <= ENDPOINT_TOLERANCE && run.end <= ENDPOINT_TOLERANCE;
    let at_end = run.start >= 1.0 - ENDPOINT_TOLERANCE && run.end >= 1.0 - ENDPOINT_TOLERANCE;
    at_start || at_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::{EdgeRecord, VertexRecord};
    use geo::line_string;

    /// three two-way blocks along the equator, 0.001 degrees each. edges 0..3
    /// run west to east, edges 3..6 are their east to west twins.
    fn equator_graph() -> RoadGraph {
        let vertices = (0..4)
            .map(|i| VertexRecord {
                vertex_id: i,
                x: i as f64 * 0.001,
                y: 0.0,
            })
            .collect();
        let pairs = [(0, 1), (1, 2), (2, 3), (1, 0), (2, 1), (3, 2)];
        let edges = pairs
            .iter()
            .enumerate()
            .map(|(edge_id, (src, dst))| EdgeRecord {
                edge_id,
                src_vertex_id: *src,
                dst_vertex_id: *dst,
                distance: 100.0,
            })
            .collect();
        RoadGraph::new(vertices, edges, None).expect("valid graph")
    }

    fn meters(value: f64) -> Length {
        Length::new::<uom::si::length::meter>(value)
    }

    fn assert_meters(length: Length, expected: f64) {
        let result = length.get::<uom::si::length::meter>();
        assert!(
            (result - expected).abs() < 1.0,
            "value {} should be within 1.0 of {}",
            result,
            expected
        );
    }

    #[test]
    fn test_forward_match_with_virtual_ends() {
        let graph = equator_graph();
        let matcher = NearestEdgeMatcher::new(&graph).expect("index builds");
        let geometry = line_string![(x: 0.0005, y: 0.00001), (x: 0.0025, y: 0.00001)];
        let segments = matcher
            .match_segments(&geometry, meters(222.0), 3, false, meters(200.0))
            .expect("matching succeeds");
        assert_eq!(segments.len(), 1);
        let edges = &segments[0].edges;
        assert_eq!(edges.len(), 3);

        assert_eq!(
            edges[0].reference,
            EdgeReference::Virtual {
                original_edge_id: EdgeId(0),
                base_node: NodeId(4),
                adj_node: NodeId(1),
            }
        );
        assert_eq!(
            edges[1].reference,
            EdgeReference::Real {
                edge_id: EdgeId(1),
                base_node: NodeId(1),
                adj_node: NodeId(2),
            }
        );
        assert_eq!(
            edges[2].reference,
            EdgeReference::Virtual {
                original_edge_id: EdgeId(2),
                base_node: NodeId(2),
                adj_node: NodeId(5),
            }
        );
        assert_meters(edges[0].distance, 50.0);
        assert_meters(edges[1].distance, 100.0);
        assert_meters(edges[2].distance, 50.0);
    }

    #[test]
    fn test_reverse_match_uses_twin_edges() {
        let graph = equator_graph();
        let matcher = NearestEdgeMatcher::new(&graph).expect("index builds");
        let geometry = line_string![(x: 0.0025, y: 0.0), (x: 0.0005, y: 0.0)];
        let segments = matcher
            .match_segments(&geometry, meters(222.0), 3, false, meters(200.0))
            .expect("matching succeeds");
        assert_eq!(segments.len(), 1);
        let references = segments[0]
            .edges
            .iter()
            .map(|e| e.reference)
            .collect::<Vec<_>>();
        assert_eq!(
            references,
            vec![
                EdgeReference::Virtual {
                    original_edge_id: EdgeId(5),
                    base_node: NodeId(4),
                    adj_node: NodeId(2),
                },
                EdgeReference::Real {
                    edge_id: EdgeId(4),
                    base_node: NodeId(2),
                    adj_node: NodeId(1),
                },
                EdgeReference::Virtual {
                    original_edge_id: EdgeId(3),
                    base_node: NodeId(1),
                    adj_node: NodeId(5),
                },
            ]
        );
    }

    #[test]
    fn test_geometry_inside_one_edge_has_no_real_endpoint() {
        let graph = equator_graph();
        let matcher = NearestEdgeMatcher::new(&graph).expect("index builds");
        let geometry = line_string![(x: 0.0012, y: 0.0), (x: 0.0018, y: 0.0)];
        let segments = matcher
            .match_segments(&geometry, meters(66.0), 5, false, meters(200.0))
            .expect("matching succeeds");
        assert_eq!(segments.len(), 1);
        let reference = segments[0].edges[0].reference;
        assert!(reference.is_virtual());
        assert!(!reference.base_node().is_real(graph.n_vertices()));
        assert!(!reference.adj_node().is_real(graph.n_vertices()));
    }

    #[test]
    fn test_out_of_radius_is_empty() {
        let graph = equator_graph();
        let matcher = NearestEdgeMatcher::new(&graph).expect("index builds");
        let geometry = line_string![(x: 0.0005, y: 1.0), (x: 0.0025, y: 1.0)];
        let segments = matcher
            .match_segments(&geometry, meters(222.0), 3, false, meters(200.0))
            .expect("matching succeeds");
        assert!(segments.is_empty());
    }

    #[test]
    fn test_single_coordinate_is_error() {
        let graph = equator_graph();
        let matcher = NearestEdgeMatcher::new(&graph).expect("index builds");
        let geometry = LineString::new(vec![Coord { x: 0.0, y: 0.0 }]);
        let result = matcher.match_segments(&geometry, meters(0.0), 3, false, meters(200.0));
        assert!(matches!(result, Err(TrafficError::MatchingError(_))));
    }
}
