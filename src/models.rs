use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound payload for the listing pipeline. The three detail groups are
/// opaque to the pipeline: they are forwarded to the marketplace as-is,
/// except for progressive enrichment (generated description, SKU).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    #[serde(default)]
    pub location_details: Map<String, Value>,
    #[serde(default)]
    pub item_details: Map<String, Value>,
    #[serde(default)]
    pub offer_details: Map<String, Value>,
}

impl ListingRequest {
    /// A detail group missing from the payload deserializes as an empty
    /// map, so presence checks reduce to emptiness checks.
    pub fn has_all_details(&self) -> bool {
        !self.location_details.is_empty()
            && !self.item_details.is_empty()
            && !self.offer_details.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub message: String,
    pub offer_id: String,
    pub listing_id: String,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StageReport {
    pub name: String,
    pub elapsed_ms: u128,
    pub timestamp: DateTime<Utc>,
    pub output: Value,
}

impl StageReport {
    pub fn new(name: &str, elapsed_ms: u128, output: Value) -> Self {
        Self {
            name: name.to_string(),
            elapsed_ms,
            timestamp: Utc::now(),
            output,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
