use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;

use crate::domain::connector::{PlaceDetails, verdict_from_place};
use crate::domain::models::Verdict;

pub const DEFAULT_PLACES_BASE_URL: &str = "https://places.googleapis.com/v1/places";
const API_KEY_HEADER: &str = "x-goog-api-key";
const FIELD_MASK_HEADER: &str = "x-goog-fieldmask";
const EV_FIELD_MASK: &str = "evChargeOptions";

pub trait PlacesClient: Send + Sync + 'static {
    fn fetch_place(&self, place_id: &str) -> Result<PlaceDetails, ProbeError>;
}

impl<T: PlacesClient + ?Sized> PlacesClient for Box<T> {
    fn fetch_place(&self, place_id: &str) -> Result<PlaceDetails, ProbeError> {
        (**self).fetch_place(place_id)
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build places client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("invalid places api key header: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),
    #[error("{0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode place details: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Scripted(String),
}

#[derive(Debug, Clone)]
pub struct PlacesHttpClient {
    client: Client,
    base_url: String,
}

impl PlacesHttpClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let mut api_key_value = HeaderValue::from_str(api_key.trim())?;
        api_key_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, api_key_value);
        headers.insert(FIELD_MASK_HEADER, HeaderValue::from_static(EV_FIELD_MASK));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ProbeError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl PlacesClient for PlacesHttpClient {
    fn fetch_place(&self, place_id: &str) -> Result<PlaceDetails, ProbeError> {
        let url = format!("{}/{place_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(ProbeError::Transport)?;

        let status = response.status();
        let body = response.text().map_err(ProbeError::Transport)?;
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(ProbeError::from)
    }
}

/// Availability check for a single station. Every failure is folded into the
/// returned verdict.
pub struct AvailabilityProbe<C = Box<dyn PlacesClient>> {
    client: C,
    place_id: String,
}

impl<C: PlacesClient> AvailabilityProbe<C> {
    pub fn new(client: C, place_id: impl Into<String>) -> Self {
        Self {
            client,
            place_id: place_id.into(),
        }
    }

    pub fn place_id(&self) -> &str {
        &self.place_id
    }

    pub fn probe(&self) -> Verdict {
        match self.client.fetch_place(&self.place_id) {
            Ok(place) => verdict_from_place(&place),
            Err(error) => {
                tracing::warn!(place_id = %self.place_id, error = %error, "station probe failed");
                Verdict::failed(format!("Error fetching station status: {error}"))
            }
        }
    }
}
