use crate::model::{
    graph::EdgeState,
    link::WeekdayPatterns,
    source::TrafficSource,
    storage::{LookupEntry, TrafficStorage},
    TrafficError,
};
use kdam::tqdm;
use uom::si::f64::Length;

/// the lookup entries for one resolved edge, one per weekday that has a
/// pattern assigned. the iterator is lazy and can be cloned to restart it.
pub fn lookup_entries(
    edge: EdgeState,
    patterns: &WeekdayPatterns,
    distance: Length,
) -> impl Iterator<Item = LookupEntry> + Clone + '_ {
    patterns
        .iter()
        .map(move |(weekday, pattern_id)| LookupEntry::new(edge, weekday, pattern_id, distance))
}

/// writes every entry to storage, returning the number written.
pub fn commit<S, I>(storage: &mut S, entries: I) -> Result<usize, TrafficError>
where
    S: TrafficStorage + ?Sized,
    I: IntoIterator<Item = LookupEntry>,
{
    let mut count = 0;
    for entry in entries {
        storage.set_edge_traffic_pattern_lookup(&entry)?;
        count += 1;
    }
    Ok(count)
}

/// copies every pattern of the source into storage, once each.
pub fn preload_patterns<T, S>(source: &T, storage: &mut S) -> Result<usize, TrafficError>
where
    T: TrafficSource + ?Sized,
    S: TrafficStorage + ?Sized,
{
    let mut count = 0;
    for pattern in tqdm!(source.patterns(), desc = "store traffic patterns") {
        storage.set_traffic_pattern(pattern.pattern_id, &pattern.values)?;
        count += 1;
    }
    eprintln!();
    Ok(count)
}
