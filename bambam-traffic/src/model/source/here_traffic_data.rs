use super::TrafficSource;
use crate::model::link::{LinkId, PatternId, TrafficLink, TrafficPattern};
use std::collections::BTreeMap;

/// links and patterns read from a HERE traffic pattern product.
#[derive(Debug, Clone, Default)]
pub struct HereTrafficData {
    links: BTreeMap<LinkId, TrafficLink>,
    patterns: BTreeMap<PatternId, TrafficPattern>,
}

impl HereTrafficData {
    pub fn new() -> HereTrafficData {
        HereTrafficData::default()
    }

    /// adds a link, returning any link previously stored under the same id.
    pub fn add_link(&mut self, link: TrafficLink) -> Option<TrafficLink> {
        self.links.insert(link.link_id, link)
    }

    pub fn add_pattern(&mut self, pattern: TrafficPattern) -> Option<TrafficPattern> {
        self.patterns.insert(pattern.pattern_id, pattern)
    }

    pub fn link_mut(&mut self, link_id: LinkId) -> Option<&mut TrafficLink> {
        self.links.get_mut(&link_id)
    }

    pub fn n_links(&self) -> usize {
        self.links.len()
    }

    pub fn n_patterns(&self) -> usize {
        self.patterns.len()
    }
}

impl TrafficSource for HereTrafficData {
    fn link_ids(&self) -> Vec<LinkId> {
        self.links.keys().copied().collect()
    }

    fn link(&self, link_id: LinkId) -> Option<&TrafficLink> {
        self.links.get(&link_id)
    }

    fn take_link(&mut self, link_id: LinkId) -> Option<TrafficLink> {
        self.links.remove(&link_id)
    }

    fn patterns(&self) -> Box<dyn Iterator<Item = &TrafficPattern> + '_> {
        Box::new(self.patterns.values())
    }
}
