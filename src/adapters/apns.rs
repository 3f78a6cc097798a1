use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::DeliveryReceipt;

const SANDBOX_HOST: &str = "https://api.sandbox.push.apple.com";
const PRODUCTION_HOST: &str = "https://api.push.apple.com";

const APNS_ID: HeaderName = HeaderName::from_static("apns-id");
const APNS_PUSH_TYPE: HeaderName = HeaderName::from_static("apns-push-type");
const APNS_EXPIRATION: HeaderName = HeaderName::from_static("apns-expiration");
const APNS_PRIORITY: HeaderName = HeaderName::from_static("apns-priority");
const APNS_TOPIC: HeaderName = HeaderName::from_static("apns-topic");

pub trait NotificationDispatcher: Send + Sync + 'static {
    /// Delivers one alert. A fresh notification id is generated when none is
    /// supplied.
    fn send(
        &self,
        device_token: &str,
        message: &str,
        credential: &str,
        notification_id: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

impl<T: NotificationDispatcher + ?Sized> NotificationDispatcher for std::sync::Arc<T> {
    fn send(
        &self,
        device_token: &str,
        message: &str,
        credential: &str,
        notification_id: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        (**self).send(device_token, message, credential, notification_id)
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build apns client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("device token is not a hex string: {0:?}")]
    InvalidDeviceToken(String),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("apns request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApnsEnvironment {
    Sandbox,
    Production,
}

impl ApnsEnvironment {
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox {
            Self::Sandbox
        } else {
            Self::Production
        }
    }

    pub fn host(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_HOST,
            Self::Production => PRODUCTION_HOST,
        }
    }
}

#[derive(Debug)]
pub struct ApnsRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Value,
    pub notification_id: String,
}

pub fn build_request(
    base_url: &str,
    topic: &str,
    device_token: &str,
    message: &str,
    credential: &str,
    notification_id: Option<&str>,
) -> Result<ApnsRequest, DeliveryError> {
    if device_token.is_empty() || !device_token.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(DeliveryError::InvalidDeviceToken(device_token.to_string()));
    }

    let notification_id = notification_id
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut authorization = HeaderValue::from_str(&format!("bearer {credential}"))?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(APNS_ID, HeaderValue::from_str(&notification_id)?);
    headers.insert(APNS_PUSH_TYPE, HeaderValue::from_static("alert"));
    headers.insert(APNS_EXPIRATION, HeaderValue::from_static("0"));
    headers.insert(APNS_PRIORITY, HeaderValue::from_static("10"));
    headers.insert(APNS_TOPIC, HeaderValue::from_str(topic)?);

    Ok(ApnsRequest {
        url: format!("{base_url}/3/device/{device_token}"),
        headers,
        body: json!({ "aps": { "alert": message } }),
        notification_id,
    })
}

/// APNs speaks HTTP/2 only; the client is pinned to it.
#[derive(Debug, Clone)]
pub struct ApnsClient {
    client: Client,
    base_url: String,
    topic: String,
}

impl ApnsClient {
    pub fn new(
        environment: ApnsEnvironment,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        Self::with_base_url(environment.host(), topic, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .http2_prior_knowledge()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            topic: topic.into(),
        })
    }
}

impl NotificationDispatcher for ApnsClient {
    fn send(
        &self,
        device_token: &str,
        message: &str,
        credential: &str,
        notification_id: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let request = build_request(
            &self.base_url,
            &self.topic,
            device_token,
            message,
            credential,
            notification_id,
        )?;

        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .json(&request.body)
            .send()
            .map_err(DeliveryError::Transport)?;

        let status_code = response.status().as_u16();
        let response_body = response.text().map_err(DeliveryError::Transport)?;

        if (200..300).contains(&status_code) {
            tracing::info!(
                notification_id = %request.notification_id,
                status_code,
                "notification accepted by apns"
            );
        } else {
            tracing::warn!(
                notification_id = %request.notification_id,
                status_code,
                response_body = %response_body,
                "notification rejected by apns"
            );
        }

        Ok(DeliveryReceipt {
            status_code,
            response_body,
            notification_id: request.notification_id,
        })
    }
}
