use super::PatternId;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// the traffic pattern assigned to each day of the week for one travel
/// direction of a link. stored densely, Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayPatterns([Option<PatternId>; 7]);

impl WeekdayPatterns {
    pub fn new() -> WeekdayPatterns {
        WeekdayPatterns::default()
    }

    /// assigns a pattern to a weekday, returning any pattern it replaces.
    pub fn insert(&mut self, weekday: Weekday, pattern_id: PatternId) -> Option<PatternId> {
        self.0[weekday.num_days_from_monday() as usize].replace(pattern_id)
    }

    pub fn get(&self, weekday: Weekday) -> Option<PatternId> {
        self.0[weekday.num_days_from_monday() as usize]
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// the assigned (weekday, pattern) pairs in Monday to Sunday order.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, PatternId)> + Clone + '_ {
        WEEKDAYS
            .iter()
            .zip(self.0.iter())
            .filter_map(|(weekday, pattern)| pattern.map(|p| (*weekday, p)))
    }
}

impl FromIterator<(Weekday, PatternId)> for WeekdayPatterns {
    fn from_iter<T: IntoIterator<Item = (Weekday, PatternId)>>(iter: T) -> Self {
        let mut patterns = WeekdayPatterns::new();
        for (weekday, pattern_id) in iter {
            patterns.insert(weekday, pattern_id);
        }
        patterns
    }
}
