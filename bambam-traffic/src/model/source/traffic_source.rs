use crate::model::link::{LinkId, TrafficLink, TrafficPattern};

/// provider of traffic links and the speed patterns they reference.
pub trait TrafficSource {
    /// ids of the links currently held by the source, in ascending order.
    fn link_ids(&self) -> Vec<LinkId>;

    fn link(&self, link_id: LinkId) -> Option<&TrafficLink>;

    /// removes a link from the source, handing ownership to the caller.
    fn take_link(&mut self, link_id: LinkId) -> Option<TrafficLink>;

    fn patterns(&self) -> Box<dyn Iterator<Item = &TrafficPattern> + '_>;
}
