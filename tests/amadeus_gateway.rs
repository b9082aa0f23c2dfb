//! Amadeus client against a local stub of the provider API

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::NaiveDate;
use farewatch::provider::{AmadeusClient, Credentials, FareProvider};
use serde_json::json;
use tokio::net::TcpListener;

const TOKEN: &str = "stub-token";

#[derive(Clone, Default)]
struct StubState {
    token_requests: Arc<AtomicUsize>,
    searches: Arc<AtomicUsize>,
}

async fn token(
    State(state): State<StubState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let valid = form.get("grant_type").map(String::as_str) == Some("client_credentials")
        && form.get("client_id").map(String::as_str) == Some("id")
        && form.get("client_secret").map(String::as_str) == Some("secret");
    if !valid {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_client" }))).into_response();
    }
    Json(json!({ "access_token": TOKEN, "token_type": "Bearer", "expires_in": 1799 })).into_response()
}

fn offer(carrier: &str, airline: &str, total: &str) -> serde_json::Value {
    json!({
        "data": [{
            "itineraries": [{
                "segments": [{
                    "carrierCode": carrier,
                    "departure": { "at": "2025-01-02T08:15:00" },
                    "arrival": { "at": "2025-01-02T14:40:00" }
                }]
            }],
            "price": { "currency": "JPY", "total": total }
        }],
        "dictionaries": { "carriers": { carrier: airline } }
    })
}

async fn flight_offers(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.searches.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {TOKEN}") as &str);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let fixed = [("adults", "1"), ("nonStop", "true"), ("currencyCode", "JPY"), ("max", "1")];
    if fixed
        .iter()
        .any(|(k, v)| params.get(*k).map(String::as_str) != Some(*v))
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let round_trip = params.contains_key("returnDate");
    match params.get("originLocationCode").map(String::as_str) {
        Some("HND") if round_trip => Json(offer("NH", "ALL NIPPON AIRWAYS", "88000.00")).into_response(),
        Some("HND") => Json(offer("NH", "ALL NIPPON AIRWAYS", "45210.00")).into_response(),
        Some("NRT") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some("KIX") => Json(json!({ "data": [] })).into_response(),
        _ => (StatusCode::OK, "not json").into_response(),
    }
}

async fn start_stub() -> (SocketAddr, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/v1/security/oauth2/token", post(token))
        .route("/v2/shopping/flight-offers", get(flight_offers))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn connected_client() -> (AmadeusClient, StubState) {
    let (addr, state) = start_stub().await;
    let client = AmadeusClient::connect_with_base_url(
        format!("http://{addr}"),
        Some(Credentials::new("id", "secret")),
    )
    .await;
    (client, state)
}

#[tokio::test]
async fn test_token_exchange_makes_client_available() {
    let (client, state) = connected_client().await;

    assert!(client.is_available());
    assert_eq!(state.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_way_quote_includes_flight_times() {
    let (client, _state) = connected_client().await;

    let quote = client
        .quote_one_way("HND", "SIN", date(2025, 1, 2))
        .await
        .expect("HND should be quoted");

    assert_eq!(quote.airline, "ALL NIPPON AIRWAYS");
    assert_eq!(quote.price, 45210.0);
    assert_eq!(quote.departure_time.as_deref(), Some("08:15"));
    assert_eq!(quote.arrival_time.as_deref(), Some("14:40"));
}

#[tokio::test]
async fn test_round_trip_quote_sends_return_date() {
    let (client, _state) = connected_client().await;

    let quote = client
        .quote_round_trip("HND", "SIN", date(2025, 1, 2), date(2025, 1, 9))
        .await
        .expect("HND round trip should be quoted");

    assert_eq!(quote.price, 88000.0);
}

#[tokio::test]
async fn test_failures_are_swallowed_as_none() {
    let (client, state) = connected_client().await;

    // Server error
    assert!(client.quote_one_way("NRT", "SIN", date(2025, 1, 2)).await.is_none());
    // No offers
    assert!(client.quote_one_way("KIX", "SIN", date(2025, 1, 2)).await.is_none());
    // Body that is not JSON
    assert!(client.quote_one_way("ITM", "SIN", date(2025, 1, 2)).await.is_none());

    assert_eq!(state.searches.load(Ordering::SeqCst), 3);
    assert!(client.is_available(), "search failures must not disable the client");
}

#[tokio::test]
async fn test_rejected_credentials_disable_searches() {
    let (addr, state) = start_stub().await;
    let client = AmadeusClient::connect_with_base_url(
        format!("http://{addr}"),
        Some(Credentials::new("id", "wrong")),
    )
    .await;

    assert!(!client.is_available());
    assert!(client.quote_one_way("HND", "SIN", date(2025, 1, 2)).await.is_none());
    assert_eq!(
        state.searches.load(Ordering::SeqCst),
        0,
        "no search may be attempted without a token"
    );
}
