use super::{EdgeId, EdgeState, GraphTopology, NodeId};
use crate::{model::TrafficError, util::fs};
use geo::{Coord, LineString};
use kdam::tqdm;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io::BufRead, path::Path};
use uom::si::f64::Length;
use wkt::TryFromWkt;

mod filenames {
    pub const VERTICES_COMPASS: &str = "vertices-compass.csv.gz";
    pub const EDGES_COMPASS: &str = "edges-compass.csv.gz";
    pub const GEOMETRIES_ENUMERATED: &str = "edges-geometries-enumerated.txt.gz";
}

/// row of a vectorized vertex dataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VertexRecord {
    pub vertex_id: usize,
    pub x: f64,
    pub y: f64,
}

/// row of a vectorized edge dataset, distance in meters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub edge_id: usize,
    pub src_vertex_id: usize,
    pub dst_vertex_id: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RoadEdge {
    pub edge_id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub distance: Length,
}

/// an in-memory road network with dense node and edge ids. edges are stored
/// in a natural src -> dst orientation but may be viewed from either end.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    vertices: Vec<Coord<f64>>,
    edges: Vec<RoadEdge>,
    geometries: Option<Vec<LineString<f64>>>,
    /// edge id for each (src, dst) node pair
    node_pairs: HashMap<(NodeId, NodeId), EdgeId>,
}

impl RoadGraph {
    /// creates a graph from vertex coordinates and edge rows. vertex and edge
    /// ids must match their positions in the provided collections.
    pub fn new(
        vertices: Vec<VertexRecord>,
        edges: Vec<EdgeRecord>,
        geometries: Option<Vec<LineString<f64>>>,
    ) -> Result<RoadGraph, TrafficError> {
        let mut coords = Vec::with_capacity(vertices.len());
        for (index, vertex) in vertices.iter().enumerate() {
            if vertex.vertex_id != index {
                return Err(TrafficError::InvalidRecord(
                    String::from(filenames::VERTICES_COMPASS),
                    format!("vertex id {} found at row {}", vertex.vertex_id, index),
                ));
            }
            coords.push(Coord {
                x: vertex.x,
                y: vertex.y,
            });
        }
        let mut road_edges = Vec::with_capacity(edges.len());
        let mut node_pairs = HashMap::with_capacity(edges.len());
        for (index, edge) in edges.iter().enumerate() {
            if edge.edge_id != index {
                return Err(TrafficError::InvalidRecord(
                    String::from(filenames::EDGES_COMPASS),
                    format!("edge id {} found at row {}", edge.edge_id, index),
                ));
            }
            let src = NodeId(edge.src_vertex_id);
            let dst = NodeId(edge.dst_vertex_id);
            for node in [src, dst] {
                if !node.is_real(coords.len()) {
                    return Err(TrafficError::GraphMissingNodeId(node));
                }
            }
            let edge_id = EdgeId(edge.edge_id);
            node_pairs.entry((src, dst)).or_insert(edge_id);
            road_edges.push(RoadEdge {
                edge_id,
                src,
                dst,
                distance: Length::new::<uom::si::length::meter>(edge.distance),
            });
        }
        if let Some(g) = &geometries {
            if g.len() != road_edges.len() {
                return Err(TrafficError::InvalidRecord(
                    String::from(filenames::GEOMETRIES_ENUMERATED),
                    format!(
                        "found {} geometries for {} edges",
                        g.len(),
                        road_edges.len()
                    ),
                ));
            }
        }
        Ok(RoadGraph {
            vertices: coords,
            edges: road_edges,
            geometries,
            node_pairs,
        })
    }

    /// reads a graph from a directory of vectorized network files. edge
    /// geometries are optional; edges without them are drawn as straight lines.
    pub fn read_compass(directory: &Path) -> Result<RoadGraph, TrafficError> {
        let vertices_file = directory.join(filenames::VERTICES_COMPASS);
        let mut reader = fs::create_reader(&vertices_file, true, false)?;
        let mut vertices: Vec<VertexRecord> = vec![];
        for row in tqdm!(reader.deserialize::<VertexRecord>(), desc = "read vertices") {
            let vertex: VertexRecord = row.map_err(|e| {
                TrafficError::CsvReadError(vertices_file.to_string_lossy().to_string(), e)
            })?;
            vertices.push(vertex);
        }
        eprintln!();

        let edges_file = directory.join(filenames::EDGES_COMPASS);
        let mut reader = fs::create_reader(&edges_file, true, false)?;
        let mut edges: Vec<EdgeRecord> = vec![];
        for row in tqdm!(reader.deserialize::<EdgeRecord>(), desc = "read edges") {
            let edge: EdgeRecord = row.map_err(|e| {
                TrafficError::CsvReadError(edges_file.to_string_lossy().to_string(), e)
            })?;
            edges.push(edge);
        }
        eprintln!();

        let geometries_file = directory.join(filenames::GEOMETRIES_ENUMERATED);
        let geometries = if geometries_file.exists() {
            Some(read_geometries(&geometries_file)?)
        } else {
            log::info!(
                "no edge geometries found at {}, using straight lines",
                geometries_file.to_string_lossy()
            );
            None
        };

        let graph = RoadGraph::new(vertices, edges, geometries)?;
        log::info!(
            "loaded road graph with {} vertices, {} edges",
            graph.vertices.len(),
            graph.edges.len()
        );
        Ok(graph)
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RoadEdge> {
        self.edges.iter()
    }

    pub fn get_edge(&self, edge_id: EdgeId) -> Result<&RoadEdge, TrafficError> {
        self.edges
            .get(edge_id.0)
            .ok_or(TrafficError::GraphMissingEdgeId(edge_id))
    }

    pub fn get_vertex(&self, node_id: NodeId) -> Result<Coord<f64>, TrafficError> {
        self.vertices
            .get(node_id.0)
            .copied()
            .ok_or(TrafficError::GraphMissingNodeId(node_id))
    }

    /// the edge stored with the given natural orientation, if any.
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.node_pairs.get(&(src, dst)).copied()
    }

    /// the geometry of an edge in its natural src -> dst orientation.
    pub fn edge_linestring(&self, edge_id: EdgeId) -> Result<LineString<f64>, TrafficError> {
        if let Some(geometry) = self.geometries.as_ref().and_then(|g| g.get(edge_id.0)) {
            return Ok(geometry.clone());
        }
        let edge = self.get_edge(edge_id)?;
        let src = self.get_vertex(edge.src)?;
        let dst = self.get_vertex(edge.dst)?;
        Ok(LineString::new(vec![src, dst]))
    }
}

impl GraphTopology for RoadGraph {
    fn node_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_state(&self, edge_id: EdgeId, adj_node: NodeId) -> Result<EdgeState, TrafficError> {
        let edge = self.get_edge(edge_id)?;
        if edge.dst == adj_node {
            Ok(EdgeState::new(edge_id, edge.src, edge.dst))
        } else if edge.src == adj_node {
            Ok(EdgeState::new(edge_id, edge.dst, edge.src))
        } else {
            Err(TrafficError::NodeNotOnEdge(edge_id, adj_node))
        }
    }

    fn edge_geometry(&self, edge_id: EdgeId) -> Option<LineString<f64>> {
        self.edge_linestring(edge_id).ok()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// reads one WKT LINESTRING per line, enumerated by edge id.
fn read_geometries(filepath: &Path) -> Result<Vec<LineString<f64>>, TrafficError> {
    let reader = std::io::BufReader::new(fs::open_file(filepath)?);
    let mut geometries = vec![];
    for (index, line) in tqdm!(reader.lines().enumerate(), desc = "read edge geometries") {
        let line = line?;
        let wkt_str = line.trim().trim_matches('"');
        let geometry = LineString::<f64>::try_from_wkt_str(wkt_str).map_err(|e| {
            TrafficError::InvalidWKT(format!(
                "row {} of {}: {}",
                index,
                filepath.to_string_lossy(),
                e
            ))
        })?;
        geometries.push(geometry);
    }
    eprintln!();
    Ok(geometries)
}
