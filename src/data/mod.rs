//! Core data models for farewatch
//!
//! This module contains the types shared by the store, the provider gateway,
//! the cache manager and the query API: stored fare observations, ephemeral
//! provider quotes, the summaries served to clients and validated date ranges.

pub mod extract;
pub mod routes;

pub use extract::{extract_detailed, extract_simple, FlightOffersResponse};
pub use routes::{normalize_airport, DESTINATIONS, ORIGINS};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used for dates on the wire and in the store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced when building a [`DateRange`] from user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    /// The string is not a `YYYY-MM-DD` calendar date
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Unparsable(String),

    /// The end of the range lies before its start
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// An inclusive range of calendar dates, guaranteed non-empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range covering `start..=end`
    ///
    /// # Returns
    /// * `Ok(DateRange)` if `end >= start`
    /// * `Err(DateRangeError::EndBeforeStart)` otherwise
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// The `days` calendar days following `today`, excluding `today` itself
    ///
    /// A `days` of zero is treated as one so the range is never empty.
    pub fn following(today: NaiveDate, days: u64) -> Self {
        let start = today + Days::new(1);
        let end = today + Days::new(days.max(1));
        Self { start, end }
    }

    /// A range covering exactly one day
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range (inclusive on both ends)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Iterates every date in the range in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Number of days in the range
    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

/// Parses a single `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DateRangeError::Unparsable(s.to_string()))
}

/// A single provider quote for one origin/destination/date combination
///
/// Quotes are never persisted; the cache manager aggregates them across
/// origins into a [`FareObservation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Human-readable airline name
    pub airline: String,
    /// Total price in the provider's requested currency (JPY)
    pub price: f64,
    /// Outbound departure time as HH:MM, when the provider reported one
    pub departure_time: Option<String>,
    /// Outbound arrival time as HH:MM, when the provider reported one
    pub arrival_time: Option<String>,
}

impl Quote {
    pub fn new(airline: impl Into<String>, price: f64) -> Self {
        Self {
            airline: airline.into(),
            price,
            departure_time: None,
            arrival_time: None,
        }
    }
}

/// Price, airline and outbound times extracted from a detailed provider payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDetails {
    pub price: f64,
    pub airline: String,
    pub departure_time: String,
    pub arrival_time: String,
}

impl From<FlightDetails> for Quote {
    fn from(details: FlightDetails) -> Self {
        Self {
            airline: details.airline,
            price: details.price,
            departure_time: Some(details.departure_time),
            arrival_time: Some(details.arrival_time),
        }
    }
}

/// Cheapest one-way fare stored for a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneWayFare {
    pub price: f64,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
}

/// Cheapest round-trip fare stored for a date
///
/// The return date only exists together with a price, which keeps
/// `roundtrip_return_date` set exactly when `roundtrip_price` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTripFare {
    pub price: f64,
    pub return_date: NaiveDate,
}

/// The cheapest known fares for one destination on one date
///
/// Keyed by `(destination, date)`; `origin` and `airline` come from the
/// one-way winner when there is one, otherwise from the round-trip winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareObservation {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub oneway: Option<OneWayFare>,
    pub roundtrip: Option<RoundTripFare>,
    pub airline: Option<String>,
    /// When this observation was last written
    pub scanned_at: DateTime<Utc>,
}

impl FareObservation {
    pub fn oneway_price(&self) -> Option<f64> {
        self.oneway.as_ref().map(|f| f.price)
    }

    pub fn roundtrip_price(&self) -> Option<f64> {
        self.roundtrip.as_ref().map(|f| f.price)
    }

    pub fn roundtrip_return_date(&self) -> Option<NaiveDate> {
        self.roundtrip.as_ref().map(|f| f.return_date)
    }

    /// Summary of the one-way fare, if this observation has one
    pub fn oneway_summary(&self) -> Option<FareSummary> {
        let fare = self.oneway.as_ref()?;
        Some(FareSummary {
            price: fare.price,
            date: self.date,
            origin: self.origin.clone(),
            airline: self.airline.clone(),
            return_date: None,
            departure_time: fare.departure_time.clone(),
            arrival_time: fare.arrival_time.clone(),
        })
    }

    /// Summary of the round-trip fare, if this observation has one
    pub fn roundtrip_summary(&self) -> Option<FareSummary> {
        let fare = self.roundtrip.as_ref()?;
        Some(FareSummary {
            price: fare.price,
            date: self.date,
            origin: self.origin.clone(),
            airline: self.airline.clone(),
            return_date: Some(fare.return_date),
            departure_time: None,
            arrival_time: None,
        })
    }
}

/// A cheapest fare as served to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareSummary {
    pub price: f64,
    pub date: NaiveDate,
    pub origin: String,
    pub airline: Option<String>,
    /// Only set for round trips
    #[serde(rename = "returnDate", skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
}

/// Cheapest one-way and round-trip fares for a destination over a date range
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheapestFares {
    #[serde(rename = "oneWay")]
    pub one_way: Option<FareSummary>,
    #[serde(rename = "roundTrip")]
    pub round_trip: Option<FareSummary>,
}
