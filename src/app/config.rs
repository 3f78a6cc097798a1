use crate::adapters::places::DEFAULT_PLACES_BASE_URL;
use crate::app::AppError;

const DEFAULT_PLACE_ID: &str = "ChIJlf0s_HFLtokRRa9H_ouBaLM";
const DEFAULT_MESSAGE: &str = "Charging station is now available!";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub place_id: String,
    pub places_api_key_path: String,
    pub places_base_url: String,
    pub places_replay_path: Option<String>,
    pub poll_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub http_bind: String,
    pub availability_log_path: String,
    pub device_tokens_path: String,
    pub notifications: Option<NotificationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub message: String,
    pub team_id: String,
    pub bundle_id: String,
    pub key_id_path: String,
    pub private_key_path: String,
    pub sandbox: bool,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval_secs = parse_or_default(&lookup, "POLL_INTERVAL_SECS", 300_u64)?;
        if poll_interval_secs == 0 {
            return Err(AppError::config(
                "POLL_INTERVAL_SECS must be greater than zero",
            ));
        }

        let notifications = if parse_bool_or_default(&lookup, "NOTIFICATIONS_ENABLED", false)? {
            Some(NotificationConfig {
                message: string_or_default(&lookup, "NOTIFICATION_MESSAGE", DEFAULT_MESSAGE),
                team_id: required(&lookup, "APNS_TEAM_ID")?,
                bundle_id: required(&lookup, "APNS_BUNDLE_ID")?,
                key_id_path: string_or_default(&lookup, "APNS_KEY_ID_PATH", "apns_key_id.key"),
                private_key_path: string_or_default(
                    &lookup,
                    "APNS_PRIVATE_KEY_PATH",
                    "apns_auth_key.p8",
                ),
                sandbox: parse_bool_or_default(&lookup, "APNS_SANDBOX", true)?,
                timeout_secs: parse_or_default(&lookup, "APNS_TIMEOUT_SECS", 10_u64)?,
            })
        } else {
            None
        };

        Ok(Self {
            place_id: string_or_default(&lookup, "STATION_PLACE_ID", DEFAULT_PLACE_ID),
            places_api_key_path: string_or_default(&lookup, "PLACES_API_KEY_PATH", "key.key"),
            places_base_url: string_or_default(
                &lookup,
                "PLACES_API_BASE_URL",
                DEFAULT_PLACES_BASE_URL,
            ),
            places_replay_path: non_empty(&lookup, "PLACES_REPLAY_PATH"),
            poll_interval_secs,
            probe_timeout_secs: parse_or_default(&lookup, "PROBE_TIMEOUT_SECS", 10_u64)?,
            http_bind: string_or_default(&lookup, "HTTP_BIND", "0.0.0.0:5121"),
            availability_log_path: string_or_default(
                &lookup,
                "AVAILABILITY_LOG_PATH",
                "station_availability.csv",
            ),
            device_tokens_path: string_or_default(
                &lookup,
                "DEVICE_TOKENS_PATH",
                "device_tokens.json",
            ),
            notifications,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or_else(|| {
        AppError::config(format!("{key} is required when notifications are enabled"))
    })
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

fn parse_bool_or_default<F>(lookup: &F, key: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!("{key} must be a boolean"))),
    }
}
