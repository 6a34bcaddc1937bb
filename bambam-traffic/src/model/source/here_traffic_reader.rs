use super::HereTrafficData;
use crate::{
    model::{
        link::{
            LinkDirectionality, LinkId, PatternId, TrafficLink, TrafficPattern, TravelDirection,
        },
        TrafficError,
    },
    util::fs,
};
use chrono::Weekday;
use geo::LineString;
use kdam::tqdm;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use wkt::TryFromWkt;

/// row of the streets file: one traffic link with its WKT geometry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct StreetRow {
    link_id: i64,
    func_class: u8,
    dir_travel: String,
    #[serde(alias = "geometry")]
    wkt: String,
}

/// row of the reference pattern file. weekday columns use the HERE day
/// letters U (Sunday), M, T, W, R (Thursday), F, S.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ReferencePatternRow {
    link_pvid: i64,
    travel_direction: String,
    u: Option<i64>,
    m: Option<i64>,
    t: Option<i64>,
    w: Option<i64>,
    r: Option<i64>,
    f: Option<i64>,
    s: Option<i64>,
}

impl ReferencePatternRow {
    fn weekday_patterns(&self) -> impl Iterator<Item = (Weekday, PatternId)> {
        [
            (Weekday::Sun, self.u),
            (Weekday::Mon, self.m),
            (Weekday::Tue, self.t),
            (Weekday::Wed, self.w),
            (Weekday::Thu, self.r),
            (Weekday::Fri, self.f),
            (Weekday::Sat, self.s),
        ]
        .into_iter()
        .filter_map(|(weekday, id)| id.map(|id| (weekday, PatternId(id))))
    }
}

/// reads the three files of a HERE traffic pattern product: the streets
/// file (links and geometries), the 15 minute speed pattern file and the
/// reference file assigning patterns to each link direction and weekday.
#[derive(Debug, Clone)]
pub struct HereTrafficReader {
    pub streets_file: PathBuf,
    pub patterns_file: PathBuf,
    pub ref_pattern_file: PathBuf,
}

impl HereTrafficReader {
    pub fn new(streets_file: &Path, patterns_file: &Path, ref_pattern_file: &Path) -> Self {
        HereTrafficReader {
            streets_file: streets_file.to_path_buf(),
            patterns_file: patterns_file.to_path_buf(),
            ref_pattern_file: ref_pattern_file.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<HereTrafficData, TrafficError> {
        let mut data = HereTrafficData::new();
        log::info!("  (((1))) reading traffic links");
        read_streets(&self.streets_file, &mut data)?;
        log::info!("  (((2))) reading traffic patterns");
        read_patterns(&self.patterns_file, &mut data)?;
        log::info!("  (((3))) assigning traffic patterns to links");
        read_reference_patterns(&self.ref_pattern_file, &mut data)?;
        log::info!(
            "read {} traffic links and {} traffic patterns",
            data.n_links(),
            data.n_patterns()
        );
        Ok(data)
    }
}

fn read_streets(filepath: &Path, data: &mut HereTrafficData) -> Result<(), TrafficError> {
    let filename = filepath.to_string_lossy().to_string();
    let mut reader = fs::create_reader(filepath, true, false)?;
    let mut n_skipped = 0;
    for (index, row) in tqdm!(
        reader.deserialize::<StreetRow>().enumerate(),
        desc = "read traffic links"
    ) {
        let row = row.map_err(|e| TrafficError::CsvReadError(filename.clone(), e))?;
        let directionality = match LinkDirectionality::from_code(&row.dir_travel) {
            Some(d) => d,
            None => {
                log::warn!(
                    "skipping link {} at row {}: unknown travel direction '{}'",
                    row.link_id,
                    index,
                    row.dir_travel
                );
                n_skipped += 1;
                continue;
            }
        };
        let geometry = LineString::<f64>::try_from_wkt_str(&row.wkt).map_err(|e| {
            TrafficError::InvalidWKT(format!("link {} in {}: {}", row.link_id, filename, e))
        })?;
        let link = TrafficLink::new(LinkId(row.link_id), geometry, directionality, row.func_class);
        if data.add_link(link).is_some() {
            log::warn!("link {} appears more than once, keeping the last", row.link_id);
        }
    }
    eprintln!();
    if n_skipped > 0 {
        log::warn!("skipped {n_skipped} traffic links with unknown travel direction");
    }
    Ok(())
}

/// the pattern file has a header row followed by rows of a pattern id and
/// its speed values, one column per time bucket.
fn read_patterns(filepath: &Path, data: &mut HereTrafficData) -> Result<(), TrafficError> {
    let filename = filepath.to_string_lossy().to_string();
    let mut reader = fs::create_reader(filepath, true, true)?;
    for row in tqdm!(reader.records(), desc = "read traffic patterns") {
        let record = row.map_err(|e| TrafficError::CsvReadError(filename.clone(), e))?;
        let mut fields = record.iter();
        let pattern_id = fields
            .next()
            .and_then(|f| f.parse::<i64>().ok())
            .map(PatternId)
            .ok_or_else(|| {
                TrafficError::InvalidRecord(filename.clone(), format!("bad pattern id: {record:?}"))
            })?;
        let values = fields
            .filter(|f| !f.is_empty())
            .map(|f| f.parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                TrafficError::InvalidRecord(filename.clone(), format!("pattern {pattern_id}: {e}"))
            })?;
        if values.is_empty() {
            log::warn!("traffic pattern {pattern_id} has no speed values");
        }
        data.add_pattern(TrafficPattern::new(pattern_id, values));
    }
    eprintln!();
    Ok(())
}

fn read_reference_patterns(
    filepath: &Path,
    data: &mut HereTrafficData,
) -> Result<(), TrafficError> {
    let filename = filepath.to_string_lossy().to_string();
    let mut reader = fs::create_reader(filepath, true, false)?;
    let mut n_unknown_links = 0;
    for row in tqdm!(
        reader.deserialize::<ReferencePatternRow>(),
        desc = "read traffic pattern references"
    ) {
        let row = row.map_err(|e| TrafficError::CsvReadError(filename.clone(), e))?;
        let direction = match TravelDirection::from_code(&row.travel_direction) {
            Some(d) => d,
            None => {
                log::warn!(
                    "skipping pattern reference for link {}: unknown travel direction '{}'",
                    row.link_pvid,
                    row.travel_direction
                );
                continue;
            }
        };
        let link = match data.link_mut(LinkId(row.link_pvid)) {
            Some(link) => link,
            None => {
                n_unknown_links += 1;
                continue;
            }
        };
        for (weekday, pattern_id) in row.weekday_patterns() {
            link.set_traffic_pattern_id(direction, weekday, pattern_id);
        }
    }
    eprintln!();
    if n_unknown_links > 0 {
        log::info!("{n_unknown_links} pattern references point to links not in the streets file");
    }
    Ok(())
}
