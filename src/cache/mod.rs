//! Fare cache module
//!
//! Sits between the query paths (scheduled scan and HTTP API) and the
//! provider: it tops the fare store up with fresh observations for the dates
//! being asked about, then answers cheapest-fare queries from the store.
//! Stale observations are re-fetched rather than purged, so a provider outage
//! still leaves the last known fares available.

mod manager;

pub use manager::{
    CacheError, CoverageReport, FareCacheManager, FRESHNESS_WINDOW_HOURS, TRIP_LENGTH_DAYS,
};
