mod here_traffic_data;
mod here_traffic_reader;
mod traffic_source;

pub use here_traffic_data::HereTrafficData;
pub use here_traffic_reader::HereTrafficReader;
pub use traffic_source::TrafficSource;
