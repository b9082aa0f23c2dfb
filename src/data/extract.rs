//! Fare extraction from flight-offers search payloads
//!
//! The provider answers every search with a JSON document holding a `data`
//! array of offers and a `dictionaries.carriers` map from carrier code to
//! airline name. Every field is optional here: a payload that lacks anything
//! we need simply yields `None`, so extraction never fails loudly.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::FlightDetails;

/// Flight-offers search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    data: Vec<FlightOffer>,
    #[serde(default)]
    dictionaries: Option<Dictionaries>,
}

#[derive(Debug, Clone, Deserialize)]
struct FlightOffer {
    #[serde(default)]
    itineraries: Vec<Itinerary>,
    price: Option<OfferPrice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Itinerary {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    carrier_code: Option<String>,
    departure: Option<Endpoint>,
    arrival: Option<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct Endpoint {
    at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OfferPrice {
    total: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Dictionaries {
    #[serde(default)]
    carriers: HashMap<String, String>,
}

impl FlightOffersResponse {
    /// Parses a raw response body, returning `None` if it is not a JSON object
    /// of the expected shape
    pub fn from_json(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn first_segment(&self) -> Option<(&FlightOffer, &Segment)> {
        let offer = self.data.first()?;
        let segment = offer.itineraries.first()?.segments.first()?;
        Some((offer, segment))
    }

    fn airline_for(&self, segment: &Segment) -> Option<String> {
        let code = segment.carrier_code.as_deref()?;
        self.dictionaries.as_ref()?.carriers.get(code).cloned()
    }
}

/// Extracts the airline name and total price of the first offer
///
/// # Returns
/// * `Some((airline, price))` when the first offer has a first segment with a
///   carrier listed in the carrier dictionary and a numeric, non-negative total
/// * `None` for an empty response or any missing or malformed field
pub fn extract_simple(response: &FlightOffersResponse) -> Option<(String, f64)> {
    let (offer, segment) = response.first_segment()?;
    let airline = response.airline_for(segment)?;
    let price = parse_price(offer)?;
    Some((airline, price))
}

/// Like [`extract_simple`], additionally reading the first segment's
/// departure and arrival timestamps and formatting them as `HH:MM`
pub fn extract_detailed(response: &FlightOffersResponse) -> Option<FlightDetails> {
    let (offer, segment) = response.first_segment()?;
    let airline = response.airline_for(segment)?;
    let price = parse_price(offer)?;
    let departure_time = hour_minute(segment.departure.as_ref()?.at.as_deref()?)?;
    let arrival_time = hour_minute(segment.arrival.as_ref()?.at.as_deref()?)?;

    Some(FlightDetails {
        price,
        airline,
        departure_time,
        arrival_time,
    })
}

fn parse_price(offer: &FlightOffer) -> Option<f64> {
    let total: f64 = offer.price.as_ref()?.total.as_deref()?.trim().parse().ok()?;
    (total.is_finite() && total >= 0.0).then_some(total)
}

/// Formats an ISO 8601 local timestamp (e.g. "2025-01-02T08:15:00") as "08:15"
fn hour_minute(timestamp: &str) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M"))
        .ok()?;
    Some(parsed.format("%H:%M").to_string())
}
