use crate::{
    algorithm::{MatchingDiagnostics, MatchingSummary, TrafficMatching},
    config::TrafficMatchingConfiguration,
    model::{
        graph::{EdgeId, NodeId, RoadGraph},
        link::PatternId,
        matching::NearestEdgeMatcher,
        source::HereTrafficReader,
        storage::{TrafficGraphStorage, TrafficStorage},
        TrafficCliError,
    },
};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// answer to a pattern and speed query against a persisted storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficQueryResult {
    pub edge_id: EdgeId,
    pub base_node: NodeId,
    pub adj_node: NodeId,
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub pattern_id: Option<PatternId>,
    pub speed_kph: Option<u16>,
}

/// reads the traffic data named in a configuration file and the road graph
/// in `graph_directory`, matches them and writes the resulting traffic
/// storage (and diagnostics, if enabled) to `output_directory`.
pub fn run_match(
    configuration_file: &String,
    graph_directory: &Path,
    output_directory: &Path,
) -> Result<MatchingSummary, TrafficCliError> {
    log::info!("reading traffic matching configuration from {configuration_file}");
    let conf = TrafficMatchingConfiguration::try_from(configuration_file)?;
    let radius = conf.get_matching_radius();

    let mut storage = if conf.overwrite {
        TrafficGraphStorage::create(output_directory)?
    } else {
        TrafficGraphStorage::open(output_directory)?
    };
    if storage.is_matched() {
        log::info!(
            "traffic storage at {} is already matched, skipping",
            output_directory.to_string_lossy()
        );
        return Ok(MatchingSummary {
            already_matched: true,
            ..Default::default()
        });
    }

    let reader = HereTrafficReader::new(
        conf.streets_file()?,
        conf.patterns_file()?,
        conf.ref_pattern_file()?,
    );
    let mut traffic_data = reader.read()?;
    let graph = RoadGraph::read_compass(graph_directory)?;
    let matcher = NearestEdgeMatcher::new(&graph)?;
    let mut diagnostics = if conf.output_log {
        Some(MatchingDiagnostics::new(output_directory, radius))
    } else {
        None
    };

    let mut matching = TrafficMatching::new(&matcher, &graph, radius);
    let summary = matching.run(&mut traffic_data, &mut storage, diagnostics.as_mut())?;
    if let Some(d) = &diagnostics {
        d.export(&graph)?;
    }
    Ok(summary)
}

/// looks up the pattern and speed for an oriented edge in a persisted storage.
///
/// # Arguments
///
/// * `weekday` - day name or abbreviation, such as "mon" or "Monday"
/// * `time`    - time of day as HH:MM
pub fn run_query(
    storage_directory: &Path,
    edge_id: usize,
    base_node: usize,
    adj_node: usize,
    weekday: &str,
    time: &str,
) -> Result<TrafficQueryResult, TrafficCliError> {
    let weekday = weekday.parse::<Weekday>().map_err(|e| {
        TrafficCliError::InvalidArgument(format!("weekday '{weekday}': {e:?}"))
    })?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|e| TrafficCliError::InvalidArgument(format!("time '{time}': {e}")))?;
    if !storage_directory.is_dir() {
        return Err(TrafficCliError::InvalidArgument(format!(
            "storage directory {} does not exist",
            storage_directory.to_string_lossy()
        )));
    }
    let storage = TrafficGraphStorage::open(storage_directory)?;
    let (edge_id, base_node, adj_node) = (EdgeId(edge_id), NodeId(base_node), NodeId(adj_node));
    let pattern_id = storage.get_edge_traffic_pattern(edge_id, base_node, adj_node, weekday);
    let speed_kph = storage.get_speed_value(edge_id, base_node, adj_node, weekday, time);
    Ok(TrafficQueryResult {
        edge_id,
        base_node,
        adj_node,
        weekday,
        time,
        pattern_id,
        speed_kph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::{EdgeRecord, EdgeState, VertexRecord};
    use crate::model::storage::LookupEntry;
    use crate::util::fs;
    use csv::QuoteStyle;
    use uom::si::f64::Length;

    fn temp_directory(name: &str) -> std::path::PathBuf {
        let directory =
            std::env::temp_dir().join(format!("bambam-traffic-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&directory);
        std::fs::create_dir_all(&directory).expect("temp directory");
        directory
    }

    /// three two-way blocks along the equator, edges 3..6 are the twins of 0..3
    fn write_graph(directory: &Path) {
        let mut writer = fs::create_writer(
            directory,
            "vertices-compass.csv.gz",
            true,
            QuoteStyle::Necessary,
            true,
        )
        .expect("create vertices file")
        .expect("overwrite enabled");
        for i in 0..4 {
            let row = VertexRecord {
                vertex_id: i,
                x: i as f64 * 0.001,
                y: 0.0,
            };
            writer.serialize(row).expect("write vertex");
        }
        writer.flush().expect("flush vertices");
        drop(writer);

        let mut writer = fs::create_writer(
            directory,
            "edges-compass.csv.gz",
            true,
            QuoteStyle::Necessary,
            true,
        )
        .expect("create edges file")
        .expect("overwrite enabled");
        let pairs = [(0, 1), (1, 2), (2, 3), (1, 0), (2, 1), (3, 2)];
        for (edge_id, (src, dst)) in pairs.iter().enumerate() {
            let row = EdgeRecord {
                edge_id,
                src_vertex_id: *src,
                dst_vertex_id: *dst,
                distance: 100.0,
            };
            writer.serialize(row).expect("write edge");
        }
        writer.flush().expect("flush edges");
    }

    fn write_traffic(directory: &Path) -> String {
        std::fs::write(
            directory.join("streets.csv"),
            "LINK_ID,FUNC_CLASS,DIR_TRAVEL,WKT\n\
             1001,3,B,\"LINESTRING (0.0005 0.00001, 0.0025 0.00001)\"\n",
        )
        .expect("write streets");
        let header = (0..96).map(|i| format!("H{i}")).collect::<Vec<_>>().join(",");
        let fast = (0..96).map(|_| "50").collect::<Vec<_>>().join(",");
        let slow = (0..96).map(|_| "20").collect::<Vec<_>>().join(",");
        std::fs::write(
            directory.join("patterns.csv"),
            format!("PATTERN_ID,{header}\n77,{fast}\n88,{slow}\n"),
        )
        .expect("write patterns");
        std::fs::write(
            directory.join("references.csv"),
            "LINK_PVID,TRAVEL_DIRECTION,U,M,T,W,R,F,S\n\
             1001,F,,77,,,,,\n\
             1001,T,,88,,,,,\n",
        )
        .expect("write references");
        let conf = format!(
            "streets = \"{}\"\npattern_15min = \"{}\"\nref_pattern = \"{}\"\nradius = 50.0\n",
            directory.join("streets.csv").to_string_lossy(),
            directory.join("patterns.csv").to_string_lossy(),
            directory.join("references.csv").to_string_lossy(),
        );
        let conf_file = directory.join("traffic.toml");
        std::fs::write(&conf_file, conf).expect("write configuration");
        conf_file.to_string_lossy().to_string()
    }

    #[test]
    fn test_match_then_query() {
        let directory = temp_directory("app-match-test");
        write_graph(&directory);
        let conf_file = write_traffic(&directory);
        let output = directory.join("output");

        let summary = run_match(&conf_file, &directory, &output).expect("matching run");
        assert_eq!(summary.links_processed, 1);
        assert_eq!(summary.links_matched, 1);
        assert_eq!(summary.patterns_stored, 2);
        assert!(summary.entries_written >= 2);

        let result = run_query(&output, 1, 1, 2, "mon", "08:00").expect("query");
        assert_eq!(result.pattern_id, Some(PatternId(77)));
        assert_eq!(result.speed_kph, Some(50));
        let result = run_query(&output, 4, 2, 1, "mon", "08:00").expect("query");
        assert_eq!(result.pattern_id, Some(PatternId(88)));
        assert_eq!(result.speed_kph, Some(20));
        let result = run_query(&output, 1, 1, 2, "tue", "08:00").expect("query");
        assert_eq!(result.pattern_id, None);

        // the persisted storage is matched, a second run does nothing
        let summary = run_match(&conf_file, &directory, &output).expect("second run");
        assert!(summary.already_matched);
        let _ = std::fs::remove_dir_all(&directory);
    }

    #[test]
    fn test_matched_storage_skips_reading_inputs() {
        let directory = temp_directory("app-matched-test");
        let output = directory.join("output");
        let mut storage = TrafficGraphStorage::create(&output).expect("storage");
        storage.set_matched();
        storage.flush().expect("flush");

        // neither the traffic files nor the graph exist
        let conf = format!(
            "streets_file = \"{0}/streets.csv\"\npatterns_file = \"{0}/patterns.csv\"\nref_pattern_file = \"{0}/references.csv\"\noutput_log = true\n",
            directory.join("missing").to_string_lossy(),
        );
        let conf_file = directory.join("traffic.toml");
        std::fs::write(&conf_file, conf).expect("write configuration");
        let conf_file = conf_file.to_string_lossy().to_string();

        let summary =
            run_match(&conf_file, &directory.join("no-graph"), &output).expect("matched run");
        assert!(summary.already_matched);
        assert_eq!(summary.links_processed, 0);
        let geojson_files = std::fs::read_dir(&output)
            .expect("output directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "geojson"))
            .count();
        assert_eq!(geojson_files, 0);
        let _ = std::fs::remove_dir_all(&directory);
    }

    #[test]
    fn test_query_persisted_storage() {
        let directory = temp_directory("app-query-test");
        let mut storage = TrafficGraphStorage::create(&directory).expect("storage");
        let values: Vec<u16> = (0..96).map(|i| 20 + i as u16).collect();
        storage
            .set_traffic_pattern(PatternId(77), &values)
            .expect("write");
        let entry = LookupEntry::new(
            EdgeState::new(EdgeId(50), NodeId(1), NodeId(2)),
            Weekday::Mon,
            PatternId(77),
            Length::new::<uom::si::length::meter>(60.0),
        );
        storage
            .set_edge_traffic_pattern_lookup(&entry)
            .expect("write");
        storage.set_matched();
        storage.flush().expect("flush");

        let result = run_query(&directory, 50, 1, 2, "Monday", "00:30").expect("query");
        assert_eq!(result.pattern_id, Some(PatternId(77)));
        assert_eq!(result.speed_kph, Some(22));

        let result = run_query(&directory, 50, 2, 1, "mon", "00:30").expect("query");
        assert_eq!(result.pattern_id, None);
        assert_eq!(result.speed_kph, None);

        assert!(matches!(
            run_query(&directory, 50, 1, 2, "someday", "00:30"),
            Err(TrafficCliError::InvalidArgument(_))
        ));
        assert!(matches!(
            run_query(&directory, 50, 1, 2, "mon", "25:99"),
            Err(TrafficCliError::InvalidArgument(_))
        ));
        let _ = std::fs::remove_dir_all(&directory);
    }
}
