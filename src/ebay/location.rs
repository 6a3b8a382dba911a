use crate::ebay::client::{MarketplaceClient, MarketplaceError};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;
use urlencoding::encode;

/// Looks the location up before creating it. An existing location is an
/// idempotent no-op: the key is returned unchanged and no create request
/// is ever issued. A lookup status other than 200 or 404 is its own
/// failure, distinct from a failed create.
pub async fn ensure_location(
    client: &MarketplaceClient,
    details: &Map<String, Value>,
) -> Result<String, MarketplaceError> {
    let key = details
        .get("locationKey")
        .and_then(Value::as_str)
        .ok_or(MarketplaceError::MissingField {
            field: "locationKey",
        })?;

    let path = format!("/location/{}", encode(key));
    let lookup = client.get(&path).await?;
    match lookup.status {
        StatusCode::OK => {
            debug!(target = "bazaar.ebay", location = %key, "location already provisioned");
            Ok(key.to_string())
        }
        StatusCode::NOT_FOUND => {
            let created = client
                .post(&path, Some(&Value::Object(details.clone())))
                .await?;
            if created.status == StatusCode::NO_CONTENT {
                Ok(key.to_string())
            } else {
                Err(created.unexpected("location create"))
            }
        }
        _ => Err(lookup.unexpected("location lookup")),
    }
}
