//! SQLite-backed fare store

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use super::schema::MIG_0001_INIT;
use super::{FareStore, StoreError};
use crate::data::{DateRange, FareObservation, OneWayFare, RoundTripFare, DATE_FORMAT};

const SELECT_COLUMNS: &str = "SELECT origin, destination, date, oneway_price, oneway_departure_time, \
     oneway_arrival_time, roundtrip_price, roundtrip_return_date, airline, scanned_at_ms \
     FROM fare_observations";

/// Fare store persisted in a single SQLite database
///
/// The connection is shared between the scheduler and the query API behind a
/// mutex; every operation is a single statement, so upserts are atomic.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating parent directories
    /// and tables as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database, mostly useful for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(MIG_0001_INIT)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied statement
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored observations across all destinations
    pub fn observation_count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(1) FROM fare_observations", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn select(
        &self,
        destination: &str,
        range: &DateRange,
        min_scanned_at_ms: Option<i64>,
    ) -> Result<Vec<FareObservation>, StoreError> {
        let conn = self.conn();
        let start = range.start().format(DATE_FORMAT).to_string();
        let end = range.end().format(DATE_FORMAT).to_string();

        let rows = match min_scanned_at_ms {
            Some(cutoff) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{SELECT_COLUMNS} WHERE destination = ?1 AND date BETWEEN ?2 AND ?3 \
                     AND scanned_at_ms >= ?4 ORDER BY date"
                ))?;
                let rows = stmt
                    .query_map(params![destination, start, end, cutoff], RawRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{SELECT_COLUMNS} WHERE destination = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date"
                ))?;
                let rows = stmt
                    .query_map(params![destination, start, end], RawRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter().map(RawRow::into_observation).collect()
    }
}

impl FareStore for SqliteStore {
    fn upsert(&self, obs: &FareObservation) -> Result<(), StoreError> {
        let oneway = obs.oneway.as_ref();
        let roundtrip = obs.roundtrip.as_ref();
        self.conn().execute(
            "INSERT INTO fare_observations(origin, destination, date, oneway_price, oneway_departure_time, \
             oneway_arrival_time, roundtrip_price, roundtrip_return_date, airline, scanned_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(destination, date) DO UPDATE SET origin=excluded.origin, \
             oneway_price=excluded.oneway_price, oneway_departure_time=excluded.oneway_departure_time, \
             oneway_arrival_time=excluded.oneway_arrival_time, roundtrip_price=excluded.roundtrip_price, \
             roundtrip_return_date=excluded.roundtrip_return_date, airline=excluded.airline, \
             scanned_at_ms=excluded.scanned_at_ms",
            params![
                obs.origin,
                obs.destination,
                obs.date.format(DATE_FORMAT).to_string(),
                oneway.map(|f| f.price),
                oneway.and_then(|f| f.departure_time.as_deref()),
                oneway.and_then(|f| f.arrival_time.as_deref()),
                roundtrip.map(|f| f.price),
                roundtrip.map(|f| f.return_date.format(DATE_FORMAT).to_string()),
                obs.airline,
                obs.scanned_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn query(
        &self,
        destination: &str,
        range: &DateRange,
    ) -> Result<Vec<FareObservation>, StoreError> {
        self.select(destination, range, None)
    }

    fn query_fresh(
        &self,
        destination: &str,
        range: &DateRange,
        not_older_than: Duration,
    ) -> Result<Vec<FareObservation>, StoreError> {
        let cutoff = (Utc::now() - not_older_than).timestamp_millis();
        self.select(destination, range, Some(cutoff))
    }
}

fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
    // journal_mode answers with the resulting mode, so it has to be read back
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

/// Column values as read from SQLite, before date parsing
struct RawRow {
    origin: String,
    destination: String,
    date: String,
    oneway_price: Option<f64>,
    oneway_departure_time: Option<String>,
    oneway_arrival_time: Option<String>,
    roundtrip_price: Option<f64>,
    roundtrip_return_date: Option<String>,
    airline: Option<String>,
    scanned_at_ms: i64,
}

impl RawRow {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            origin: r.get(0)?,
            destination: r.get(1)?,
            date: r.get(2)?,
            oneway_price: r.get(3)?,
            oneway_departure_time: r.get(4)?,
            oneway_arrival_time: r.get(5)?,
            roundtrip_price: r.get(6)?,
            roundtrip_return_date: r.get(7)?,
            airline: r.get(8)?,
            scanned_at_ms: r.get(9)?,
        })
    }

    fn into_observation(self) -> Result<FareObservation, StoreError> {
        let date = parse_stored_date(&self.date)?;
        let scanned_at = DateTime::<Utc>::from_timestamp_millis(self.scanned_at_ms)
            .ok_or_else(|| StoreError::CorruptRow(format!("scanned_at_ms {}", self.scanned_at_ms)))?;

        let oneway = self.oneway_price.map(|price| OneWayFare {
            price,
            departure_time: self.oneway_departure_time,
            arrival_time: self.oneway_arrival_time,
        });

        let roundtrip = match (self.roundtrip_price, self.roundtrip_return_date) {
            (Some(price), Some(return_date)) => Some(RoundTripFare {
                price,
                return_date: parse_stored_date(&return_date)?,
            }),
            (None, None) => None,
            _ => {
                return Err(StoreError::CorruptRow(format!(
                    "{} {}: round-trip price and return date must be set together",
                    self.destination, self.date
                )))
            }
        };

        Ok(FareObservation {
            origin: self.origin,
            destination: self.destination,
            date,
            oneway,
            roundtrip,
            airline: self.airline,
            scanned_at,
        })
    }
}

fn parse_stored_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| StoreError::CorruptRow(format!("date '{s}'")))
}
