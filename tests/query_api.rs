//! HTTP query API driven in-process through the router

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use farewatch::api;
use farewatch::cache::FareCacheManager;
use farewatch::data::Quote;
use farewatch::provider::FareProvider;
use farewatch::store::SqliteStore;
use serde_json::Value;
use tower::ServiceExt;

/// Quotes HND to SIN only; everything else has no fare
struct HanedaSingaporeOnly {
    available: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl FareProvider for HanedaSingaporeOnly {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn quote_one_way(&self, origin: &str, destination: &str, date: NaiveDate) -> Option<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let cheap_day = NaiveDate::from_ymd_opt(2025, 1, 2)?;
        match (origin, destination) {
            ("HND", "SIN") if date == cheap_day => Some(Quote::new("SINGAPORE AIRLINES", 32000.0)),
            ("HND", "SIN") => Some(Quote::new("SINGAPORE AIRLINES", 41000.0)),
            _ => None,
        }
    }

    async fn quote_round_trip(
        &self,
        origin: &str,
        destination: &str,
        _date: NaiveDate,
        _return_date: NaiveDate,
    ) -> Option<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (origin, destination) {
            ("HND", "SIN") => Some(Quote::new("SINGAPORE AIRLINES", 70000.0)),
            _ => None,
        }
    }
}

fn app(available: bool) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = HanedaSingaporeOnly {
        available,
        calls: calls.clone(),
    };
    let store = SqliteStore::open_in_memory().expect("In-memory store should open");
    let manager = Arc::new(FareCacheManager::new(store, provider));
    (api::router(manager), calls)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    let json = serde_json::from_slice(&body).expect("response should be JSON");
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app(true);
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_cheapest_flights_keyed_by_destination() {
    let (app, calls) = app(true);
    let (status, json) = get_json(
        app,
        "/api/cheapest-flights?startDate=2025-01-01&endDate=2025-01-03",
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let sin = &json["SIN"];
    assert_eq!(sin["oneWay"]["price"], 32000.0);
    assert_eq!(sin["oneWay"]["date"], "2025-01-02");
    assert_eq!(sin["oneWay"]["origin"], "HND");
    assert_eq!(sin["oneWay"]["airline"], "SINGAPORE AIRLINES");
    assert_eq!(sin["roundTrip"]["price"], 70000.0);
    // Ties resolve to the earliest date
    assert_eq!(sin["roundTrip"]["date"], "2025-01-01");
    assert_eq!(sin["roundTrip"]["returnDate"], "2025-01-08");

    assert!(json["MNL"]["oneWay"].is_null());
    assert!(json["MNL"]["roundTrip"].is_null());

    // 2 destinations x 3 dates x 2 origins x (one-way + round-trip)
    assert_eq!(calls.load(Ordering::SeqCst), 24);
}

#[tokio::test]
async fn test_unavailable_provider_still_answers_200() {
    let (app, calls) = app(false);
    let (status, json) = get_json(
        app,
        "/api/cheapest-flights?startDate=2025-01-01&endDate=2025-01-03",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    for destination in ["SIN", "MNL"] {
        assert!(json[destination]["oneWay"].is_null());
        assert!(json[destination]["roundTrip"].is_null());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_parameters_are_rejected() {
    let (app, _) = app(true);
    let (status, json) = get_json(app, "/api/cheapest-flights?startDate=2025-01-01").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("endDate"));
}

#[tokio::test]
async fn test_invalid_date_is_rejected() {
    let (app, calls) = app(true);
    let (status, json) = get_json(
        app,
        "/api/cheapest-flights?startDate=2025-13-01&endDate=2025-12-31",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("2025-13-01"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reversed_range_is_rejected() {
    let (app, _) = app(true);
    let (status, _) = get_json(
        app,
        "/api/cheapest-flights?startDate=2025-01-10&endDate=2025-01-01",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
