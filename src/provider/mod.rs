//! Flight-search provider gateway
//!
//! The cache manager only sees the [`FareProvider`] trait. Implementations
//! swallow their own failures: a network error, an error status or an
//! unusable payload all come back as `None`.

pub mod amadeus;

pub use amadeus::{AmadeusClient, Credentials, ProviderError};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::data::Quote;

/// Source of the cheapest fare for a single search
#[async_trait]
pub trait FareProvider: Send + Sync {
    /// Whether the provider can answer at all. A provider that failed to
    /// authenticate stays unavailable for the rest of the process.
    fn is_available(&self) -> bool {
        true
    }

    /// Cheapest non-stop one-way fare departing on `date`
    async fn quote_one_way(&self, origin: &str, destination: &str, date: NaiveDate)
        -> Option<Quote>;

    /// Cheapest non-stop round-trip fare departing on `date` and returning on
    /// `return_date`
    async fn quote_round_trip(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        return_date: NaiveDate,
    ) -> Option<Quote>;
}

#[async_trait]
impl<T: FareProvider + ?Sized> FareProvider for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    async fn quote_one_way(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Option<Quote> {
        (**self).quote_one_way(origin, destination, date).await
    }

    async fn quote_round_trip(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        return_date: NaiveDate,
    ) -> Option<Quote> {
        (**self)
            .quote_round_trip(origin, destination, date, return_date)
            .await
    }
}
