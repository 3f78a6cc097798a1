use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Normalized outcome of one availability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub available: bool,
    pub update_time: Option<String>,
    pub error: Option<String>,
    pub available_count: u32,
    pub total_count: u32,
}

impl Verdict {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            available: false,
            update_time: None,
            error: Some(message.into()),
            available_count: 0,
            total_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StationStatus {
    pub available: bool,
    pub last_update_time: Option<String>,
    pub last_check: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub available: bool,
    pub available_count: u32,
    pub total_count: u32,
    pub update_time: Option<String>,
    pub error: Option<String>,
}

impl AvailabilityLogEntry {
    pub fn from_verdict(verdict: &Verdict, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            available: verdict.available,
            available_count: verdict.available_count,
            total_count: verdict.total_count,
            update_time: verdict.update_time.clone(),
            error: verdict.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub token: String,
    pub registered_at: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub status_code: u16,
    pub response_body: String,
    pub notification_id: String,
}

pub fn timestamp_to_iso8601(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
