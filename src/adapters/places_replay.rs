use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::places::{PlacesClient, ProbeError};
use crate::domain::connector::PlaceDetails;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(default = "default_loop")]
    pub loop_forever: bool,
    pub responses: Vec<ReplayEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEvent {
    pub ok: Option<Value>,
    pub error: Option<String>,
}

fn default_loop() -> bool {
    true
}

/// Offline stand-in for the Places API replaying scripted payloads in order.
#[derive(Debug)]
pub struct PlacesReplayClient {
    script: ReplayScript,
    next_index: Mutex<usize>,
}

impl PlacesReplayClient {
    pub fn from_file(path: &str) -> Result<Self, ProbeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|error| ProbeError::Scripted(format!("failed to read {path}: {error}")))?;
        let script: ReplayScript = serde_json::from_str(&content)?;
        Self::from_script(script)
    }

    pub fn from_script(script: ReplayScript) -> Result<Self, ProbeError> {
        if script.responses.is_empty() {
            return Err(ProbeError::Scripted(
                "replay script must contain at least one response".to_string(),
            ));
        }

        Ok(Self {
            script,
            next_index: Mutex::new(0),
        })
    }

    fn next_event(&self) -> Result<ReplayEvent, ProbeError> {
        let mut index = self
            .next_index
            .lock()
            .map_err(|_| ProbeError::Scripted("replay state lock poisoned".to_string()))?;

        if *index >= self.script.responses.len() {
            if !self.script.loop_forever {
                return Err(ProbeError::Scripted("replay finished".to_string()));
            }
            *index = 0;
        }

        let event = self.script.responses[*index].clone();
        *index += 1;
        Ok(event)
    }
}

impl PlacesClient for PlacesReplayClient {
    fn fetch_place(&self, _place_id: &str) -> Result<PlaceDetails, ProbeError> {
        match self.next_event()? {
            ReplayEvent {
                ok: Some(payload),
                error: None,
            } => serde_json::from_value(payload).map_err(ProbeError::from),
            ReplayEvent {
                ok: None,
                error: Some(kind),
            } => Err(map_scripted_error(&kind)),
            _ => Err(ProbeError::Scripted(
                "replay event must contain exactly one of: ok or error".to_string(),
            )),
        }
    }
}

fn map_scripted_error(kind: &str) -> ProbeError {
    match kind.trim().to_ascii_lowercase().as_str() {
        "timeout" => ProbeError::Scripted("operation timed out".to_string()),
        "connection_refused" => ProbeError::Scripted("connection refused".to_string()),
        "server_error" => ProbeError::Status {
            status: 500,
            body: "scripted server error".to_string(),
        },
        "invalid_json" => match serde_json::from_str::<Value>("not json") {
            Err(error) => ProbeError::Decode(error),
            Ok(_) => ProbeError::Scripted("invalid json".to_string()),
        },
        other => ProbeError::Scripted(format!("unknown scripted error kind: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::adapters::places::{PlacesClient, ProbeError};

    use super::{PlacesReplayClient, ReplayScript};

    fn script(value: serde_json::Value) -> ReplayScript {
        serde_json::from_value(value).expect("script should deserialize")
    }

    #[test]
    fn replays_and_loops_scripted_payloads() {
        let client = PlacesReplayClient::from_script(script(json!({
            "responses": [
                {"ok": {"evChargeOptions": {"connectorAggregation": [{"maxChargeRateKw": 7, "availableCount": 0, "count": 2}]}}},
                {"ok": {"evChargeOptions": {"connectorAggregation": [{"maxChargeRateKw": 7, "availableCount": 1, "count": 2}]}}}
            ]
        })))
        .expect("script should load");

        let counts: Vec<u32> = (0..3)
            .map(|_| {
                client.fetch_place("place").expect("replay should succeed").connectors()[0]
                    .available_count
            })
            .collect();

        assert_eq!(counts, vec![0, 1, 0]);
    }

    #[test]
    fn stops_after_last_event_without_loop() {
        let client = PlacesReplayClient::from_script(script(json!({
            "loop_forever": false,
            "responses": [{"ok": {}}]
        })))
        .expect("script should load");

        assert!(client.fetch_place("place").is_ok());
        assert!(matches!(
            client.fetch_place("place"),
            Err(ProbeError::Scripted(_))
        ));
    }

    #[test]
    fn maps_scripted_failures() {
        let client = PlacesReplayClient::from_script(script(json!({
            "responses": [
                {"error": "server_error"},
                {"error": "invalid_json"},
                {"error": "timeout"}
            ]
        })))
        .expect("script should load");

        assert!(matches!(
            client.fetch_place("place"),
            Err(ProbeError::Status { status: 500, .. })
        ));
        assert!(matches!(
            client.fetch_place("place"),
            Err(ProbeError::Decode(_))
        ));
        assert!(matches!(
            client.fetch_place("place"),
            Err(ProbeError::Scripted(_))
        ));
    }

    #[test]
    fn rejects_empty_script() {
        let result = PlacesReplayClient::from_script(script(json!({"responses": []})));

        assert!(matches!(result, Err(ProbeError::Scripted(_))));
    }

    #[test]
    fn loads_fixture_file() {
        let path = format!(
            "{}/testdata/replay/rising_edge.json",
            env!("CARGO_MANIFEST_DIR").replace("\\", "/")
        );
        let client = PlacesReplayClient::from_file(&path).expect("fixture should load");

        assert!(client.fetch_place("place").is_ok());
    }
}
