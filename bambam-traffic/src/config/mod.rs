mod traffic;

pub use traffic::TrafficMatchingConfiguration;
