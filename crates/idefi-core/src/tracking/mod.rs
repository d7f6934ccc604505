//! Creation counters persisted to a flat JSON file

mod counters;
mod store;

pub use counters::TrackingCounters;
pub use store::TrackingStore;
