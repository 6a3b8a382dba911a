use crate::ebay::client::{MarketplaceClient, MarketplaceError};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use urlencoding::encode;

/// Replaces the inventory item keyed by the SKU inside the details.
/// The returned SKU is an echo of caller input, not a server value.
pub async fn upsert_inventory_item(
    client: &MarketplaceClient,
    details: &Map<String, Value>,
) -> Result<String, MarketplaceError> {
    let sku = details
        .get("sku")
        .and_then(Value::as_str)
        .ok_or(MarketplaceError::MissingField { field: "sku" })?;

    let path = format!("/inventory_item/{}", encode(sku));
    let response = client.put(&path, &Value::Object(details.clone())).await?;
    match response.status {
        StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(sku.to_string()),
        _ => Err(response.unexpected("inventory item upsert")),
    }
}
