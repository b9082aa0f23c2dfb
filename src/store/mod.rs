//! Fare record store
//!
//! The store holds one [`FareObservation`] per `(destination, date)`. Writes
//! are upserts (last write wins); nothing is ever deleted, stale rows are
//! simply overwritten by the next successful fetch.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::data::{DateRange, FareObservation};

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file or its directory could not be created
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be turned back into an observation
    #[error("Corrupt fare row: {0}")]
    CorruptRow(String),
}

/// Storage contract used by the cache manager
pub trait FareStore: Send + Sync {
    /// Writes an observation, replacing any previous one for the same
    /// `(destination, date)`. Readers never see a partially written row.
    fn upsert(&self, observation: &FareObservation) -> Result<(), StoreError>;

    /// All observations for `destination` dated inside `range`, ordered by date
    fn query(&self, destination: &str, range: &DateRange)
        -> Result<Vec<FareObservation>, StoreError>;

    /// Like [`FareStore::query`], limited to observations written within
    /// `not_older_than` of now
    fn query_fresh(
        &self,
        destination: &str,
        range: &DateRange,
        not_older_than: Duration,
    ) -> Result<Vec<FareObservation>, StoreError> {
        let cutoff = Utc::now() - not_older_than;
        Ok(self
            .query(destination, range)?
            .into_iter()
            .filter(|obs| obs.scanned_at >= cutoff)
            .collect())
    }
}

impl<T: FareStore + ?Sized> FareStore for Arc<T> {
    fn upsert(&self, observation: &FareObservation) -> Result<(), StoreError> {
        (**self).upsert(observation)
    }

    fn query(
        &self,
        destination: &str,
        range: &DateRange,
    ) -> Result<Vec<FareObservation>, StoreError> {
        (**self).query(destination, range)
    }

    fn query_fresh(
        &self,
        destination: &str,
        range: &DateRange,
        not_older_than: Duration,
    ) -> Result<Vec<FareObservation>, StoreError> {
        (**self).query_fresh(destination, range, not_older_than)
    }
}
