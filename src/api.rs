//! HTTP query API
//!
//! `GET /api/cheapest-flights?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD` fills
//! any gaps in the cache for the range and answers with the cheapest one-way
//! and round-trip fare per destination. Provider trouble never changes the
//! status code: missing fares are simply `null`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cache::{CacheError, FareCacheManager};
use crate::data::{CheapestFares, DateRange, DateRangeError, DESTINATIONS};
use crate::provider::FareProvider;
use crate::store::FareStore;

/// Cheapest fares keyed by destination code
pub type CheapestByDestination = BTreeMap<String, CheapestFares>;

/// Query string of `/api/cheapest-flights`
#[derive(Debug, Deserialize)]
pub struct CheapestFlightsParams {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

impl CheapestFlightsParams {
    fn date_range(&self) -> Result<DateRange, ApiError> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => Ok(DateRange::parse(start, end)?),
            _ => Err(ApiError::BadRequest(
                "startDate and endDate are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors turned into JSON error responses
#[derive(Debug)]
pub enum ApiError {
    /// The request itself is invalid (400)
    BadRequest(String),
    /// The fare store failed (500)
    Internal(String),
}

impl From<DateRangeError> for ApiError {
    fn from(e: DateRangeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => {
                error!(error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Runs the query path for every destination: fill gaps, then pick the
/// cheapest fares
pub async fn cheapest_for_all<S, P>(
    manager: &FareCacheManager<S, P>,
    range: &DateRange,
) -> Result<CheapestByDestination, CacheError>
where
    S: FareStore,
    P: FareProvider,
{
    let mut results = BTreeMap::new();
    for destination in DESTINATIONS {
        let fares = manager.refresh_and_query(destination, range).await?;
        results.insert(destination.to_string(), fares);
    }
    Ok(results)
}

/// Builds the API router over a shared cache manager
pub fn router<S, P>(manager: Arc<FareCacheManager<S, P>>) -> Router
where
    S: FareStore + 'static,
    P: FareProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/cheapest-flights", get(cheapest_flights::<S, P>))
        .with_state(manager)
}

/// Serves `router` on `listener` until Ctrl-C
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "query API listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("starting graceful shutdown for query API...");
}

async fn health() -> &'static str {
    "ok"
}

async fn cheapest_flights<S, P>(
    State(manager): State<Arc<FareCacheManager<S, P>>>,
    Query(params): Query<CheapestFlightsParams>,
) -> Result<Json<CheapestByDestination>, ApiError>
where
    S: FareStore + 'static,
    P: FareProvider + 'static,
{
    let range = params.date_range()?;
    let results = cheapest_for_all(&manager, &range).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_require_both_dates() {
        let params = CheapestFlightsParams {
            start_date: Some("2025-01-01".to_string()),
            end_date: None,
        };
        assert!(matches!(params.date_range(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_params_reject_reversed_range() {
        let params = CheapestFlightsParams {
            start_date: Some("2025-01-05".to_string()),
            end_date: Some("2025-01-01".to_string()),
        };
        let Err(ApiError::BadRequest(message)) = params.date_range() else {
            panic!("expected a bad request");
        };
        assert!(message.contains("before"));
    }

    #[test]
    fn test_params_accept_valid_range() {
        let params = CheapestFlightsParams {
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-01".to_string()),
        };
        assert_eq!(params.date_range().unwrap().len_days(), 1);
    }

    #[test]
    fn test_internal_error_maps_to_500() {
        let response = ApiError::Internal("disk full".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
