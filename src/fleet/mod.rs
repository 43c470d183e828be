pub mod orchestrator;
pub mod scorer;
pub mod structs;

pub use orchestrator::{parse_app_list, FleetConfig, FleetOrchestrator};
pub use scorer::rank_hotspots;
pub use structs::{FleetFetch, HotspotEntry, HotspotResult, SearchMatch, SearchResult, ServiceObservation};
