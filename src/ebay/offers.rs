use crate::ebay::client::{MarketplaceClient, MarketplaceError};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use urlencoding::encode;

/// Creates an offer from the details, which must already carry the SKU.
/// A 201 whose body lacks `offerId` returns an empty id; HTTP success
/// alone is not enough, and the orchestrator rejects the empty id.
pub async fn create_offer(
    client: &MarketplaceClient,
    details: &Map<String, Value>,
) -> Result<String, MarketplaceError> {
    let response = client
        .post("/offer", Some(&Value::Object(details.clone())))
        .await?;
    if response.status != StatusCode::CREATED {
        return Err(response.unexpected("offer create"));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CreateOfferResponse {
        offer_id: Option<String>,
    }
    let payload: CreateOfferResponse = serde_json::from_str(&response.body).unwrap_or_default();
    Ok(payload.offer_id.unwrap_or_default())
}

/// Publishes an offer and returns the listing identifier. An empty offer
/// id is refused before any network call.
pub async fn publish_offer(
    client: &MarketplaceClient,
    offer_id: &str,
) -> Result<String, MarketplaceError> {
    if offer_id.trim().is_empty() {
        return Err(MarketplaceError::MissingField { field: "offerId" });
    }

    let path = format!("/offer/{}/publish/", encode(offer_id));
    let response = client.post(&path, None).await?;
    if response.status != StatusCode::OK {
        return Err(response.unexpected("offer publish"));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct PublishResponse {
        listing_id: Option<String>,
    }
    let payload: PublishResponse = serde_json::from_str(&response.body).unwrap_or_default();
    Ok(payload.listing_id.unwrap_or_default())
}
