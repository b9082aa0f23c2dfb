//! Amadeus flight-offers search client
//!
//! Authenticates once with the OAuth client-credentials grant and then issues
//! `max=1` flight-offers searches, letting the provider rank offers by price.
//! A failed token exchange leaves the client without a token for its whole
//! lifetime; every search is then skipped.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::FareProvider;
use crate::data::{extract_detailed, extract_simple, FlightOffersResponse, Quote, DATE_FORMAT};

/// Test environment of the Amadeus self-service API
pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const SEARCH_PATH: &str = "/v2/shopping/flight-offers";

/// Currency requested for every search
const CURRENCY: &str = "JPY";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur when talking to Amadeus
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No client id/secret was configured
    #[error("Amadeus credentials are not configured")]
    MissingCredentials,

    /// The client has no access token, so it cannot search
    #[error("No Amadeus access token available")]
    NoToken,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    /// The response body was not a flight-offers document
    #[error("Malformed provider response")]
    MalformedResponse,
}

/// OAuth client credentials
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the Amadeus flight-offers search API
#[derive(Debug, Clone)]
pub struct AmadeusClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
}

impl AmadeusClient {
    /// Connects to the default Amadeus endpoint
    ///
    /// Never fails: if the token exchange does not succeed the client is
    /// returned without a token and reports itself as unavailable.
    pub async fn connect(credentials: Option<Credentials>) -> Self {
        Self::connect_with_base_url(DEFAULT_BASE_URL, credentials).await
    }

    /// Connects to a custom base URL (another environment, or a local stub)
    pub async fn connect_with_base_url(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        let http_client = Client::new();
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let token = match credentials {
            Some(creds) => match fetch_token(&http_client, &base_url, &creds).await {
                Ok(token) => {
                    info!("obtained Amadeus access token");
                    Some(token)
                }
                Err(e) => {
                    warn!(error = %e, "failed to obtain Amadeus access token; searches disabled");
                    None
                }
            },
            None => {
                warn!("{}; searches disabled", ProviderError::MissingCredentials);
                None
            }
        };

        Self {
            http_client,
            base_url,
            token,
        }
    }

    /// Whether a token was obtained at connect time
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Runs one flight-offers search with the given route parameters
    async fn search(
        &self,
        route: &[(&str, String)],
    ) -> Result<FlightOffersResponse, ProviderError> {
        let token = self.token.as_deref().ok_or(ProviderError::NoToken)?;

        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, SEARCH_PATH))
            .bearer_auth(token)
            .query(route)
            .query(&[
                ("adults", "1"),
                ("nonStop", "true"),
                ("currencyCode", CURRENCY),
                ("max", "1"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        FlightOffersResponse::from_json(&text).ok_or(ProviderError::MalformedResponse)
    }

    /// Runs a search and reduces the response to a quote, logging and
    /// swallowing any failure
    async fn quote(&self, route: Vec<(&str, String)>, label: &str) -> Option<Quote> {
        if !self.has_token() {
            debug!(search = label, "skipping search without access token");
            return None;
        }

        match self.search(&route).await {
            Ok(response) => {
                let quote = quote_from_response(&response);
                if quote.is_none() {
                    debug!(search = label, "no usable offer in provider response");
                }
                quote
            }
            Err(e) => {
                warn!(search = label, error = %e, "flight search failed");
                None
            }
        }
    }
}

#[async_trait]
impl FareProvider for AmadeusClient {
    fn is_available(&self) -> bool {
        self.has_token()
    }

    async fn quote_one_way(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Option<Quote> {
        let label = format!("{origin}-{destination} {date}");
        let route = vec![
            ("originLocationCode", origin.to_string()),
            ("destinationLocationCode", destination.to_string()),
            ("departureDate", date.format(DATE_FORMAT).to_string()),
        ];
        self.quote(route, &label).await
    }

    async fn quote_round_trip(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        return_date: NaiveDate,
    ) -> Option<Quote> {
        let label = format!("{origin}-{destination} {date}/{return_date}");
        let route = vec![
            ("originLocationCode", origin.to_string()),
            ("destinationLocationCode", destination.to_string()),
            ("departureDate", date.format(DATE_FORMAT).to_string()),
            ("returnDate", return_date.format(DATE_FORMAT).to_string()),
        ];
        self.quote(route, &label).await
    }
}

/// Prefers the detailed extraction (with flight times) and falls back to
/// price and airline only
fn quote_from_response(response: &FlightOffersResponse) -> Option<Quote> {
    extract_detailed(response)
        .map(Quote::from)
        .or_else(|| extract_simple(response).map(|(airline, price)| Quote::new(airline, price)))
}

async fn fetch_token(
    http_client: &Client,
    base_url: &str,
    credentials: &Credentials,
) -> Result<String, ProviderError> {
    let response = http_client
        .post(format!("{base_url}{TOKEN_PATH}"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}
