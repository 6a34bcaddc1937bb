use super::link_processor::LinkMatch;
use crate::{
    model::{
        graph::{EdgeId, EdgeState, GraphTopology},
        link::{LinkId, TrafficLink},
        TrafficError,
    },
    util::fs,
};
use geo::LineString;
use serde_json::json;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use uom::si::f64::Length;

mod kinds {
    pub const TRAFFIC_LINKS: &str = "traffic_links";
    pub const MATCHED_TRAFFIC_LINKS: &str = "matched_traffic_links";
    pub const MATCHED_GRAPH_EDGES: &str = "matched_graph_edges";
    pub const GRAPH_EDGES: &str = "graph_edges";
}

/// collects the geometries seen during a matching pass so they can be
/// inspected in a GIS. only created when diagnostics are enabled.
#[derive(Debug, Clone)]
pub struct MatchingDiagnostics {
    output_directory: PathBuf,
    search_radius: Length,
    timestamp: String,
    traffic_links: BTreeMap<LinkId, LineString<f64>>,
    matched_links: BTreeMap<LinkId, LineString<f64>>,
    /// matched edges and the links that matched onto them
    matched_edges: BTreeMap<EdgeId, Vec<LinkId>>,
}

impl MatchingDiagnostics {
    pub fn new(output_directory: &Path, search_radius: Length) -> MatchingDiagnostics {
        MatchingDiagnostics {
            output_directory: output_directory.to_path_buf(),
            search_radius,
            timestamp: chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
            traffic_links: BTreeMap::new(),
            matched_links: BTreeMap::new(),
            matched_edges: BTreeMap::new(),
        }
    }

    pub fn add_link(&mut self, link: &TrafficLink, link_match: &LinkMatch) {
        self.traffic_links
            .insert(link.link_id, link.geometry.clone());
        if link_match.is_matched() {
            self.matched_links
                .insert(link.link_id, link.geometry.clone());
        }
    }

    pub fn add_matched_edge(&mut self, link_id: Option<LinkId>, edge: &EdgeState) {
        let links = self.matched_edges.entry(edge.edge_id).or_default();
        if let Some(link_id) = link_id {
            if !links.contains(&link_id) {
                links.push(link_id);
            }
        }
    }

    pub fn n_traffic_links(&self) -> usize {
        self.traffic_links.len()
    }

    pub fn n_matched_links(&self) -> usize {
        self.matched_links.len()
    }

    pub fn n_matched_edges(&self) -> usize {
        self.matched_edges.len()
    }

    /// path of the export file for one kind of geometry.
    pub fn filepath(&self, kind: &str) -> PathBuf {
        let radius = self.search_radius.get::<uom::si::length::meter>();
        self.output_directory
            .join(format!("{}_radius_{}_{}.geojson", self.timestamp, radius, kind))
    }

    /// writes each non-empty collection of geometries to its own GeoJSON
    /// file. the full graph is only written when the topology provides edge
    /// geometries.
    ///
    /// # Returns
    ///
    /// * the paths of the files written
    pub fn export<G>(&self, topology: &G) -> Result<Vec<PathBuf>, TrafficError>
    where
        G: GraphTopology + ?Sized,
    {
        fs::create_dirs(&self.output_directory)?;
        let mut written = vec![];

        let features = link_features(&self.traffic_links);
        written.extend(self.write_collection(kinds::TRAFFIC_LINKS, features)?);

        let features = link_features(&self.matched_links);
        written.extend(self.write_collection(kinds::MATCHED_TRAFFIC_LINKS, features)?);

        let mut features = vec![];
        for (edge_id, link_ids) in self.matched_edges.iter() {
            match topology.edge_geometry(*edge_id) {
                Some(geometry) => {
                    let link_ids: Vec<i64> = link_ids.iter().map(|l| l.0).collect();
                    let properties = json!({ "edge_id": edge_id.0, "link_ids": link_ids });
                    features.push(feature(&geometry, properties));
                }
                None => log::debug!("no geometry for matched edge {edge_id}"),
            }
        }
        written.extend(self.write_collection(kinds::MATCHED_GRAPH_EDGES, features)?);

        let features = (0..topology.edge_count())
            .filter_map(|index| {
                let edge_id = EdgeId(index);
                topology
                    .edge_geometry(edge_id)
                    .map(|g| feature(&g, json!({ "edge_id": edge_id.0 })))
            })
            .collect::<Vec<_>>();
        written.extend(self.write_collection(kinds::GRAPH_EDGES, features)?);
        Ok(written)
    }

    fn write_collection(
        &self,
        kind: &str,
        features: Vec<geojson::Feature>,
    ) -> Result<Option<PathBuf>, TrafficError> {
        if features.is_empty() {
            log::debug!("no {kind} features, skipping export");
            return Ok(None);
        }
        let filepath = self.filepath(kind);
        let n_features = features.len();
        let collection = geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        let file = File::create(&filepath).map_err(|e| {
            TrafficError::DiagnosticsError(format!(
                "failure creating {}: {}",
                filepath.to_string_lossy(),
                e
            ))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &collection)?;
        writer.flush()?;
        log::info!(
            "wrote {} {} features to {}",
            n_features,
            kind,
            filepath.to_string_lossy()
        );
        Ok(Some(filepath))
    }
}

fn link_features(links: &BTreeMap<LinkId, LineString<f64>>) -> Vec<geojson::Feature> {
    links
        .iter()
        .map(|(link_id, geometry)| feature(geometry, json!({ "link_id": link_id.0 })))
        .collect()
}

fn feature(geometry: &LineString<f64>, properties: serde_json::Value) -> geojson::Feature {
    let geometry = geojson::Geometry::from(&geo::Geometry::LineString(geometry.clone()));
    let properties = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    geojson::Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::link_processor::DirectionMatch;
    use crate::model::{
        graph::{EdgeRecord, EdgeReference, NodeId, RoadGraph, VertexRecord},
        link::{LinkDirectionality, TravelDirection},
        matching::{MatchedEdge, MatchedSegment},
    };
    use geo::line_string;

    fn graph() -> RoadGraph {
        let vertices = vec![
            VertexRecord {
                vertex_id: 0,
                x: 0.0,
                y: 0.0,
            },
            VertexRecord {
                vertex_id: 1,
                x: 0.001,
                y: 0.0,
            },
        ];
        let edges = vec![EdgeRecord {
            edge_id: 0,
            src_vertex_id: 0,
            dst_vertex_id: 1,
            distance: 111.0,
        }];
        RoadGraph::new(vertices, edges, None).expect("valid graph")
    }

    #[test]
    fn test_export_writes_geojson() {
        let directory = std::env::temp_dir().join(format!(
            "bambam-traffic-diagnostics-test-{}",
            std::process::id()
        ));
        let radius = Length::new::<uom::si::length::meter>(200.0);
        let mut diagnostics = MatchingDiagnostics::new(&directory, radius);
        let matched = TrafficLink::new(
            LinkId(1),
            line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)],
            LinkDirectionality::Both,
            3,
        );
        let unmatched = TrafficLink::new(
            LinkId(2),
            line_string![(x: 5.0, y: 5.0), (x: 5.001, y: 5.0)],
            LinkDirectionality::Both,
            3,
        );
        let mut link_match = LinkMatch::default();
        let edge = MatchedEdge::new(
            EdgeReference::Real {
                edge_id: EdgeId(0),
                base_node: NodeId(0),
                adj_node: NodeId(1),
            },
            Length::new::<uom::si::length::meter>(111.0),
        );
        link_match.directions.push(DirectionMatch {
            direction: TravelDirection::From,
            segments: vec![MatchedSegment::new(vec![edge])],
            patterns: Default::default(),
        });
        diagnostics.add_link(&matched, &link_match);
        diagnostics.add_link(&unmatched, &LinkMatch::default());
        diagnostics.add_matched_edge(
            Some(LinkId(1)),
            &EdgeState::new(EdgeId(0), NodeId(0), NodeId(1)),
        );
        assert_eq!(diagnostics.n_traffic_links(), 2);
        assert_eq!(diagnostics.n_matched_links(), 1);
        assert_eq!(diagnostics.n_matched_edges(), 1);

        let written = diagnostics.export(&graph()).expect("export");
        assert_eq!(written.len(), 4);
        let name = written[0]
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        assert!(name.ends_with("_radius_200_traffic_links.geojson"), "{name}");

        let contents = std::fs::read_to_string(&written[1]).expect("matched links file");
        let collection = contents
            .parse::<geojson::GeoJson>()
            .expect("valid geojson");
        match collection {
            geojson::GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 1),
            other => panic!("expected feature collection, found {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&directory);
    }

    #[test]
    fn test_empty_collections_are_not_written() {
        let directory = std::env::temp_dir().join(format!(
            "bambam-traffic-empty-diagnostics-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&directory);
        let radius = Length::new::<uom::si::length::meter>(200.0);
        let mut diagnostics = MatchingDiagnostics::new(&directory, radius);
        let unmatched = TrafficLink::new(
            LinkId(2),
            line_string![(x: 5.0, y: 5.0), (x: 5.001, y: 5.0)],
            LinkDirectionality::Both,
            3,
        );
        diagnostics.add_link(&unmatched, &LinkMatch::default());

        // no geometries in the graph, nothing matched
        let graph = RoadGraph::new(vec![], vec![], None).expect("empty graph");
        let written = diagnostics.export(&graph).expect("export");
        assert_eq!(written.len(), 1);
        assert!(written[0].to_string_lossy().ends_with("_traffic_links.geojson"));

        let written = MatchingDiagnostics::new(&directory, radius)
            .export(&graph)
            .expect("export");
        assert!(written.is_empty());
        let _ = std::fs::remove_dir_all(&directory);
    }
}
