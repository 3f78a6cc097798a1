use serde::Deserialize;

use crate::domain::models::Verdict;

pub const NO_CONNECTOR_DATA: &str = "No connector data available";

/// Subset of the Places "place details" payload requested through the
/// `evChargeOptions` field mask.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    #[serde(default)]
    pub ev_charge_options: Option<EvChargeOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvChargeOptions {
    #[serde(default)]
    pub connector_aggregation: Vec<ConnectorAggregation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorAggregation {
    #[serde(default, rename = "type")]
    pub connector_type: Option<String>,
    #[serde(default)]
    pub max_charge_rate_kw: f64,
    #[serde(default)]
    pub available_count: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub availability_last_update_time: Option<String>,
}

impl PlaceDetails {
    pub fn connectors(&self) -> &[ConnectorAggregation] {
        self.ev_charge_options
            .as_ref()
            .map(|options| options.connector_aggregation.as_slice())
            .unwrap_or_default()
    }
}

/// Picks the class with the lowest `maxChargeRateKw`. Equal rates keep the
/// first entry in upstream order.
pub fn select_slowest_connector(
    connectors: &[ConnectorAggregation],
) -> Option<&ConnectorAggregation> {
    connectors
        .iter()
        .min_by(|left, right| left.max_charge_rate_kw.total_cmp(&right.max_charge_rate_kw))
}

pub fn verdict_from_place(place: &PlaceDetails) -> Verdict {
    let Some(slowest) = select_slowest_connector(place.connectors()) else {
        return Verdict::failed(NO_CONNECTOR_DATA);
    };

    Verdict {
        available: slowest.available_count > 0,
        update_time: slowest.availability_last_update_time.clone(),
        error: None,
        available_count: slowest.available_count,
        total_count: slowest.count,
    }
}
