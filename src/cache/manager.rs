//! Fare cache manager
//!
//! Decides which dates of a requested range are missing or stale, fetches
//! replacements from the provider, upserts them into the store, and derives
//! the cheapest one-way and round-trip fares from whatever the store holds.

use std::collections::HashSet;

use chrono::{Days, Duration, NaiveDate, Utc};
use futures::future::join;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::data::{
    normalize_airport, CheapestFares, DateRange, FareObservation, OneWayFare, Quote,
    RoundTripFare, ORIGINS,
};
use crate::provider::FareProvider;
use crate::store::{FareStore, StoreError};

/// Maximum age of an observation before it is fetched again
pub const FRESHNESS_WINDOW_HOURS: i64 = 12;

/// Length of the round trips that are priced, in days
pub const TRIP_LENGTH_DAYS: u64 = 7;

/// Errors surfaced by the cache manager
///
/// Provider problems are never errors here; only the store can fail a call.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fare store error: {0}")]
    Store(#[from] StoreError),
}

/// What a call to [`FareCacheManager::ensure_coverage`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Days in the requested range
    pub requested: usize,
    /// Days that were missing or stale
    pub missing: usize,
    /// Missing days for which an observation was written
    pub filled: usize,
}

/// Keeps the fare store covering requested date ranges and answers
/// cheapest-fare queries from it
///
/// Both the scheduled scan and the query API go through the same manager, so
/// the gap-filling logic exists exactly once.
pub struct FareCacheManager<S, P> {
    store: S,
    provider: P,
    origins: Vec<String>,
    freshness_window: Duration,
    /// Serializes gap filling so two callers never fetch the same gap twice
    coverage_lock: Mutex<()>,
}

impl<S: FareStore, P: FareProvider> FareCacheManager<S, P> {
    /// Creates a manager over the default origin airports and freshness window
    pub fn new(store: S, provider: P) -> Self {
        Self {
            store,
            provider,
            origins: ORIGINS.iter().map(|o| o.to_string()).collect(),
            freshness_window: Duration::hours(FRESHNESS_WINDOW_HOURS),
            coverage_lock: Mutex::new(()),
        }
    }

    /// Replaces the origin airports tried for every date, in priority order
    pub fn with_origins<I, T>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.origins = origins
            .into_iter()
            .map(|o| normalize_airport(o.as_ref()))
            .collect();
        self
    }

    /// Replaces the freshness window used by [`Self::refresh_and_query`]
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Makes sure every date of `range` has an observation younger than
    /// `freshness_window`, fetching the gaps from the provider
    ///
    /// Dates never scanned and dates with a stale observation are treated the
    /// same. Gaps are filled in ascending date order. A date for which no
    /// origin produced any quote is left without a row and stays missing.
    ///
    /// # Returns
    /// * `Ok(CoverageReport)` once every filled date has been persisted
    /// * `Err(CacheError)` if the store could not be read or written
    pub async fn ensure_coverage(
        &self,
        destination: &str,
        range: &DateRange,
        freshness_window: Duration,
    ) -> Result<CoverageReport, CacheError> {
        let destination = normalize_airport(destination);
        let _guard = self.coverage_lock.lock().await;

        let fresh_dates: HashSet<NaiveDate> = self
            .store
            .query_fresh(&destination, range, freshness_window)?
            .into_iter()
            .map(|obs| obs.date)
            .collect();
        let missing: Vec<NaiveDate> = range
            .dates()
            .filter(|date| !fresh_dates.contains(date))
            .collect();

        let mut report = CoverageReport {
            requested: range.len_days(),
            missing: missing.len(),
            filled: 0,
        };
        if missing.is_empty() {
            debug!(%destination, "all dates fresh");
            return Ok(report);
        }
        if !self.provider.is_available() {
            warn!(%destination, missing = missing.len(), "provider unavailable, serving cached fares only");
            return Ok(report);
        }

        info!(%destination, missing = missing.len(), "fetching missing dates from provider");
        for date in missing {
            match self.fetch_date(&destination, date).await {
                Some(observation) => {
                    self.store.upsert(&observation)?;
                    report.filled += 1;
                }
                None => debug!(%destination, %date, "no fares found for any origin"),
            }
        }

        Ok(report)
    }

    /// Cheapest one-way and round-trip fares stored for `destination` in
    /// `range`, fresh or not
    ///
    /// Ties go to the earliest date in the range.
    pub fn cheapest_fares(
        &self,
        destination: &str,
        range: &DateRange,
    ) -> Result<CheapestFares, CacheError> {
        let destination = normalize_airport(destination);
        let observations = self.store.query(&destination, range)?;

        Ok(CheapestFares {
            one_way: cheapest_by(&observations, FareObservation::oneway_price)
                .and_then(FareObservation::oneway_summary),
            round_trip: cheapest_by(&observations, FareObservation::roundtrip_price)
                .and_then(FareObservation::roundtrip_summary),
        })
    }

    /// Fills the gaps of `range` using the manager's freshness window, then
    /// answers the cheapest-fare query
    pub async fn refresh_and_query(
        &self,
        destination: &str,
        range: &DateRange,
    ) -> Result<CheapestFares, CacheError> {
        self.ensure_coverage(destination, range, self.freshness_window)
            .await?;
        self.cheapest_fares(destination, range)
    }

    /// Queries every origin for one date and folds the answers into a single
    /// observation
    ///
    /// One-way and round-trip winners are tracked independently; within a
    /// category the first origin with the strictly lowest price wins.
    async fn fetch_date(&self, destination: &str, date: NaiveDate) -> Option<FareObservation> {
        let return_date = date + Days::new(TRIP_LENGTH_DAYS);
        let mut best_oneway: Option<(&str, Quote)> = None;
        let mut best_roundtrip: Option<(&str, Quote)> = None;

        for origin in &self.origins {
            let (oneway, roundtrip) = join(
                self.provider.quote_one_way(origin, destination, date),
                self.provider
                    .quote_round_trip(origin, destination, date, return_date),
            )
            .await;

            keep_cheaper(&mut best_oneway, origin, oneway);
            keep_cheaper(&mut best_roundtrip, origin, roundtrip);
        }

        build_observation(destination, date, return_date, best_oneway, best_roundtrip)
    }
}

fn keep_cheaper<'a>(best: &mut Option<(&'a str, Quote)>, origin: &'a str, quote: Option<Quote>) {
    let Some(quote) = quote else {
        return;
    };
    if best.as_ref().map_or(true, |(_, current)| quote.price < current.price) {
        *best = Some((origin, quote));
    }
}

/// Combines the per-category winners; `None` when neither category produced
/// a quote. Origin and airline come from the one-way winner when present.
fn build_observation(
    destination: &str,
    date: NaiveDate,
    return_date: NaiveDate,
    oneway: Option<(&str, Quote)>,
    roundtrip: Option<(&str, Quote)>,
) -> Option<FareObservation> {
    let (origin, airline) = match (&oneway, &roundtrip) {
        (Some((origin, quote)), _) | (None, Some((origin, quote))) => {
            (origin.to_string(), quote.airline.clone())
        }
        (None, None) => return None,
    };

    Some(FareObservation {
        origin,
        destination: destination.to_string(),
        date,
        oneway: oneway.map(|(_, q)| OneWayFare {
            price: q.price,
            departure_time: q.departure_time,
            arrival_time: q.arrival_time,
        }),
        roundtrip: roundtrip.map(|(_, q)| RoundTripFare {
            price: q.price,
            return_date,
        }),
        airline: Some(airline),
        scanned_at: Utc::now(),
    })
}

/// First observation with the lowest price, ignoring observations without one
fn cheapest_by(
    observations: &[FareObservation],
    price: impl Fn(&FareObservation) -> Option<f64>,
) -> Option<&FareObservation> {
    let mut best: Option<(&FareObservation, f64)> = None;
    for obs in observations {
        let Some(p) = price(obs) else {
            continue;
        };
        if best.map_or(true, |(_, current)| p < current) {
            best = Some((obs, p));
        }
    }
    best.map(|(obs, _)| obs)
}
