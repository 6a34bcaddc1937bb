use super::{EdgeOrientation, LookupEntry, TrafficStorage};
use crate::{
    model::{
        graph::{EdgeId, NodeId},
        link::PatternId,
        TrafficError,
    },
    util::fs,
};
use chrono::{NaiveTime, Timelike, Weekday};
use csv::QuoteStyle;
use kdam::tqdm;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

mod filenames {
    pub const PATTERNS: &str = "traffic-patterns.csv.gz";
    pub const LOOKUP: &str = "traffic-pattern-lookup.csv.gz";
    pub const MANIFEST: &str = "traffic-storage.json";
}

const MINUTES_PER_DAY: usize = 24 * 60;
const DAYS_PER_WEEK: usize = 7;

/// the pattern currently answering queries for one (edge, orientation, weekday) slot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LookupCandidate {
    base_node: NodeId,
    adj_node: NodeId,
    pattern_id: PatternId,
    /// matched length in meters carried by `pattern_id`
    matched_length: f64,
    n_writes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct LookupKey {
    edge_id: EdgeId,
    orientation: EdgeOrientation,
    day: u32,
}

impl LookupKey {
    fn new(edge_id: EdgeId, base_node: NodeId, adj_node: NodeId, weekday: Weekday) -> LookupKey {
        LookupKey {
            edge_id,
            orientation: EdgeOrientation::from_nodes(base_node, adj_node),
            day: weekday.num_days_from_monday(),
        }
    }
}

/// row of the persisted lookup table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LookupRow {
    edge_id: EdgeId,
    base_node: NodeId,
    adj_node: NodeId,
    weekday: Weekday,
    pattern_id: PatternId,
    matched_length: f64,
    n_writes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageManifest {
    matched: bool,
    n_patterns: usize,
    n_lookup_entries: usize,
    updated_at: String,
}

/// in-memory traffic storage, optionally backed by a directory that `flush`
/// writes to and `open` restores from.
#[derive(Debug, Default)]
pub struct TrafficGraphStorage {
    directory: Option<PathBuf>,
    matched: bool,
    patterns: HashMap<PatternId, Vec<u16>>,
    lookup: BTreeMap<LookupKey, LookupCandidate>,
    n_writes: usize,
}

impl TrafficGraphStorage {
    /// storage with no backing directory. `flush` is a no-op.
    pub fn in_memory() -> TrafficGraphStorage {
        TrafficGraphStorage::default()
    }

    /// empty storage backed by `directory`. anything a previous flush left
    /// there is replaced on the next flush.
    pub fn create(directory: &Path) -> Result<TrafficGraphStorage, TrafficError> {
        fs::create_dirs(directory)?;
        Ok(TrafficGraphStorage {
            directory: Some(directory.to_path_buf()),
            ..Default::default()
        })
    }

    /// opens storage backed by `directory`, creating it if needed and
    /// restoring any state a previous flush left there.
    pub fn open(directory: &Path) -> Result<TrafficGraphStorage, TrafficError> {
        let mut storage = TrafficGraphStorage::create(directory)?;
        let manifest_file = directory.join(filenames::MANIFEST);
        if !manifest_file.exists() {
            log::info!(
                "no traffic storage found at {}, starting empty",
                directory.to_string_lossy()
            );
            return Ok(storage);
        }
        let manifest_str = std::fs::read_to_string(&manifest_file)?;
        let manifest: StorageManifest = serde_json::from_str(&manifest_str)?;
        storage.read_patterns(&directory.join(filenames::PATTERNS))?;
        storage.read_lookup(&directory.join(filenames::LOOKUP))?;
        storage.matched = manifest.matched;
        if storage.patterns.len() != manifest.n_patterns
            || storage.lookup.len() != manifest.n_lookup_entries
        {
            return Err(TrafficError::StorageError(format!(
                "manifest at {} lists {} patterns and {} lookup entries, found {} and {}",
                manifest_file.to_string_lossy(),
                manifest.n_patterns,
                manifest.n_lookup_entries,
                storage.patterns.len(),
                storage.lookup.len()
            )));
        }
        log::info!(
            "opened traffic storage with {} patterns, {} lookup entries (matched: {})",
            storage.patterns.len(),
            storage.lookup.len(),
            storage.matched
        );
        Ok(storage)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn n_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// number of distinct (edge, orientation, weekday) slots holding a pattern.
    pub fn n_lookup_entries(&self) -> usize {
        self.lookup.len()
    }

    /// total number of lookup writes received, including superseded ones.
    pub fn n_lookup_writes(&self) -> usize {
        self.n_writes
    }

    pub fn get_traffic_pattern(&self, pattern_id: PatternId) -> Option<&[u16]> {
        self.patterns.get(&pattern_id).map(|v| v.as_slice())
    }

    /// the pattern assigned to an edge traversed from `base_node` to
    /// `adj_node` on the given weekday. when several matches wrote to this
    /// slot, the one covering the greatest length wins.
    pub fn get_edge_traffic_pattern(
        &self,
        edge_id: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
        weekday: Weekday,
    ) -> Option<PatternId> {
        let key = LookupKey::new(edge_id, base_node, adj_node, weekday);
        self.lookup.get(&key).map(|c| c.pattern_id)
    }

    /// speed in km/h on an oriented edge at a time of day.
    ///
    /// # Returns
    ///
    /// * `None` if no pattern is assigned or the pattern has no values
    pub fn get_speed_value(
        &self,
        edge_id: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
        weekday: Weekday,
        time: NaiveTime,
    ) -> Option<u16> {
        let pattern_id = self.get_edge_traffic_pattern(edge_id, base_node, adj_node, weekday)?;
        let values = self.patterns.get(&pattern_id)?;
        let index = bucket_index(values.len(), weekday, time)?;
        values.get(index).copied()
    }

    fn read_patterns(&mut self, filepath: &Path) -> Result<(), TrafficError> {
        let filename = filepath.to_string_lossy().to_string();
        let mut reader = fs::create_reader(filepath, false, true)?;
        for row in tqdm!(reader.records(), desc = "read stored traffic patterns") {
            let record = row.map_err(|e| TrafficError::CsvReadError(filename.clone(), e))?;
            let mut fields = record.iter();
            let pattern_id = fields
                .next()
                .and_then(|f| f.parse::<i64>().ok())
                .map(PatternId)
                .ok_or_else(|| {
                    TrafficError::InvalidRecord(filename.clone(), format!("{record:?}"))
                })?;
            let values = fields
                .map(|f| f.parse::<u16>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    TrafficError::InvalidRecord(
                        filename.clone(),
                        format!("pattern {pattern_id}: {e}"),
                    )
                })?;
            self.patterns.insert(pattern_id, values);
        }
        eprintln!();
        Ok(())
    }

    fn read_lookup(&mut self, filepath: &Path) -> Result<(), TrafficError> {
        let filename = filepath.to_string_lossy().to_string();
        let mut reader = fs::create_reader(filepath, true, false)?;
        for row in tqdm!(
            reader.deserialize::<LookupRow>(),
            desc = "read stored pattern lookup"
        ) {
            let row = row.map_err(|e| TrafficError::CsvReadError(filename.clone(), e))?;
            let key = LookupKey::new(row.edge_id, row.base_node, row.adj_node, row.weekday);
            let candidate = LookupCandidate {
                base_node: row.base_node,
                adj_node: row.adj_node,
                pattern_id: row.pattern_id,
                matched_length: row.matched_length,
                n_writes: row.n_writes,
            };
            self.n_writes += row.n_writes;
            self.lookup.insert(key, candidate);
        }
        eprintln!();
        Ok(())
    }

    fn write_patterns(&self, directory: &Path) -> Result<(), TrafficError> {
        let mut writer =
            fs::create_writer(directory, filenames::PATTERNS, false, QuoteStyle::Never, true)?
                .ok_or_else(|| {
                    TrafficError::StorageError(format!("cannot write {}", filenames::PATTERNS))
                })?;
        let mut patterns: Vec<(&PatternId, &Vec<u16>)> = self.patterns.iter().collect();
        patterns.sort_by_key(|(pattern_id, _)| **pattern_id);
        for (pattern_id, values) in patterns {
            let record = std::iter::once(pattern_id.to_string())
                .chain(values.iter().map(|v| v.to_string()));
            writer
                .write_record(record)
                .map_err(|e| TrafficError::CsvWriteError(String::from(filenames::PATTERNS), e))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_lookup(&self, directory: &Path) -> Result<(), TrafficError> {
        let mut writer =
            fs::create_writer(directory, filenames::LOOKUP, true, QuoteStyle::Necessary, true)?
                .ok_or_else(|| {
                    TrafficError::StorageError(format!("cannot write {}", filenames::LOOKUP))
                })?;
        for (key, candidate) in self.lookup.iter() {
            let row = LookupRow {
                edge_id: key.edge_id,
                base_node: candidate.base_node,
                adj_node: candidate.adj_node,
                weekday: weekday_from_index(key.day),
                pattern_id: candidate.pattern_id,
                matched_length: candidate.matched_length,
                n_writes: candidate.n_writes,
            };
            writer
                .serialize(row)
                .map_err(|e| TrafficError::CsvWriteError(String::from(filenames::LOOKUP), e))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TrafficStorage for TrafficGraphStorage {
    fn set_traffic_pattern(
        &mut self,
        pattern_id: PatternId,
        values: &[u16],
    ) -> Result<(), TrafficError> {
        self.patterns.insert(pattern_id, values.to_vec());
        Ok(())
    }

    fn set_edge_traffic_pattern_lookup(&mut self, entry: &LookupEntry) -> Result<(), TrafficError> {
        let key = LookupKey::new(entry.edge_id, entry.base_node, entry.adj_node, entry.weekday);
        let matched_length = entry.length.get::<uom::si::length::meter>();
        self.n_writes += 1;
        match self.lookup.get_mut(&key) {
            Some(current) => {
                current.n_writes += 1;
                if matched_length >= current.matched_length {
                    current.pattern_id = entry.pattern_id;
                    current.matched_length = matched_length;
                    current.base_node = entry.base_node;
                    current.adj_node = entry.adj_node;
                }
            }
            None => {
                let candidate = LookupCandidate {
                    base_node: entry.base_node,
                    adj_node: entry.adj_node,
                    pattern_id: entry.pattern_id,
                    matched_length,
                    n_writes: 1,
                };
                self.lookup.insert(key, candidate);
            }
        }
        Ok(())
    }

    fn is_matched(&self) -> bool {
        self.matched
    }

    fn set_matched(&mut self) {
        self.matched = true;
    }

    fn flush(&mut self) -> Result<(), TrafficError> {
        let directory = match &self.directory {
            Some(d) => d.clone(),
            None => {
                log::debug!("in-memory traffic storage, nothing to flush");
                return Ok(());
            }
        };
        fs::create_dirs(&directory)?;
        self.write_patterns(&directory)?;
        self.write_lookup(&directory)?;
        let manifest = StorageManifest {
            matched: self.matched,
            n_patterns: self.patterns.len(),
            n_lookup_entries: self.lookup.len(),
            updated_at: chrono::Local::now().to_rfc3339(),
        };
        let manifest_str = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(directory.join(filenames::MANIFEST), manifest_str)?;
        log::info!(
            "flushed {} patterns and {} lookup entries to {}",
            self.patterns.len(),
            self.lookup.len(),
            directory.to_string_lossy()
        );
        Ok(())
    }
}

/// position of the bucket covering `time`. patterns whose length splits
/// evenly into at least hourly buckets for each of 7 days span a week
/// starting Monday 00:00; all others span a single day.
fn bucket_index(n_values: usize, weekday: Weekday, time: NaiveTime) -> Option<usize> {
    if n_values == 0 {
        return None;
    }
    let minute_of_day = (time.num_seconds_from_midnight() / 60) as usize;
    let weekly = n_values % DAYS_PER_WEEK == 0 && n_values >= DAYS_PER_WEEK * 24;
    let index = if weekly {
        let day = weekday.num_days_from_monday() as usize;
        let minute_of_week = day * MINUTES_PER_DAY + minute_of_day;
        minute_of_week * n_values / (DAYS_PER_WEEK * MINUTES_PER_DAY)
    } else {
        minute_of_day * n_values / MINUTES_PER_DAY
    };
    Some(index)
}

fn weekday_from_index(day: u32) -> Weekday {
    match day {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}
