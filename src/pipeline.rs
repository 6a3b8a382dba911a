use crate::ebay::{
    MarketplaceClient, MarketplaceConfig, MarketplaceError, inventory, location, offers,
};
use crate::models::{ListingRequest, ListingResponse, StageReport};
use serde_json::{Value, json};
use std::{future::Future, sync::Arc, time::Instant};
use thiserror::Error;
use tracing::info;

/// Drives the four listing stages strictly in order, each one consuming
/// the identifier produced by the stage before it. Any stage failure, or
/// a successful call that comes back without its identifier, halts the
/// run; later stages are never invoked.
#[derive(Clone)]
pub struct Pipeline {
    client: Arc<MarketplaceClient>,
}

impl Pipeline {
    pub fn new(config: MarketplaceConfig) -> Self {
        Self {
            client: Arc::new(MarketplaceClient::new(config)),
        }
    }

    pub fn from_env() -> Self {
        Self::new(MarketplaceConfig::from_env())
    }

    pub async fn run(&self, request: ListingRequest) -> Result<ListingResponse, PipelineError> {
        if !self.client.token_present() {
            return Err(PipelineError::invalid_input(
                "auth",
                "oauth token not found",
            ));
        }
        if !request.has_all_details() {
            return Err(PipelineError::invalid_input(
                "validate",
                "missing location details, item details, or offer details in the payload",
            ));
        }

        let mut stages = Vec::new();

        let location_key = self
            .capture_stage("resolve_location", &mut stages, async {
                let key = location::ensure_location(&self.client, &request.location_details)
                    .await
                    .map_err(|err| stage_error("resolve_location", err))?;
                let key = require_identifier("resolve_location", "locationKey", key)?;
                Ok(StageOutcome::new(
                    key.clone(),
                    json!({ "locationKey": key }),
                ))
            })
            .await?;
        info!(
            target = "bazaar.pipeline",
            location = %location_key,
            "inventory location resolved"
        );

        let sku = self
            .capture_stage("register_item", &mut stages, async {
                let sku = inventory::upsert_inventory_item(&self.client, &request.item_details)
                    .await
                    .map_err(|err| stage_error("register_item", err))?;
                let sku = require_identifier("register_item", "sku", sku)?;
                Ok(StageOutcome::new(sku.clone(), json!({ "sku": sku })))
            })
            .await?;

        // The offer must reference the item it sells.
        let mut offer_details = request.offer_details.clone();
        offer_details.insert("sku".to_string(), Value::String(sku.clone()));

        let offer_id = self
            .capture_stage("create_offer", &mut stages, async {
                let offer_id = offers::create_offer(&self.client, &offer_details)
                    .await
                    .map_err(|err| stage_error("create_offer", err))?;
                let offer_id = require_identifier("create_offer", "offerId", offer_id)?;
                Ok(StageOutcome::new(
                    offer_id.clone(),
                    json!({ "offerId": offer_id, "sku": sku }),
                ))
            })
            .await?;

        let listing_id = self
            .capture_stage("publish_offer", &mut stages, async {
                let listing_id = offers::publish_offer(&self.client, &offer_id)
                    .await
                    .map_err(|err| stage_error("publish_offer", err))?;
                let listing_id = require_identifier("publish_offer", "listingId", listing_id)?;
                Ok(StageOutcome::new(
                    listing_id.clone(),
                    json!({ "listingId": listing_id, "offerId": offer_id.clone() }),
                ))
            })
            .await?;

        Ok(ListingResponse {
            message: "Offer published successfully!".to_string(),
            offer_id,
            listing_id,
            stages,
        })
    }

    async fn capture_stage<T, Fut>(
        &self,
        name: &'static str,
        stages: &mut Vec<StageReport>,
        fut: Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: Future<Output = Result<StageOutcome<T>, PipelineError>>,
    {
        let started = Instant::now();
        let outcome = fut.await?;
        let elapsed_ms = started.elapsed().as_millis();
        crate::metrics::stage_elapsed(name, elapsed_ms);
        stages.push(StageReport::new(name, elapsed_ms, outcome.output));
        Ok(outcome.value)
    }
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// A precondition failed; no remote call was attempted for it.
    InvalidInput,
    /// The marketplace answered with a status the stage does not accept.
    Remote,
    /// The call never completed at the network level.
    Transport,
    /// Transport and status were fine but the identifier was absent.
    EmptyResult,
}

impl PipelineError {
    pub fn invalid_input(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::InvalidInput)
    }

    pub fn remote(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::Remote)
    }

    pub fn transport(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::Transport)
    }

    pub fn empty_result(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::EmptyResult)
    }

    fn with_kind(
        stage: &'static str,
        message: impl Into<String>,
        kind: PipelineErrorKind,
    ) -> Self {
        Self {
            stage,
            message: message.into(),
            kind,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}

#[derive(Debug)]
struct StageOutcome<T> {
    value: T,
    output: Value,
}

impl<T> StageOutcome<T> {
    fn new(value: T, output: Value) -> Self {
        Self { value, output }
    }
}

fn stage_error(stage: &'static str, err: MarketplaceError) -> PipelineError {
    match err {
        MarketplaceError::MissingToken | MarketplaceError::MissingField { .. } => {
            PipelineError::invalid_input(stage, err.to_string())
        }
        MarketplaceError::UnexpectedStatus { .. } => PipelineError::remote(stage, err.to_string()),
        MarketplaceError::Transport(_) => PipelineError::transport(stage, err.to_string()),
    }
}

fn require_identifier(
    stage: &'static str,
    field: &'static str,
    value: String,
) -> Result<String, PipelineError> {
    if value.trim().is_empty() {
        Err(PipelineError::empty_result(
            stage,
            format!("response did not include a {field}"),
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_pipeline(server: &MockServer) -> Pipeline {
        Pipeline::new(MarketplaceConfig {
            base_url: server.uri(),
            oauth_token: "test-token".to_string(),
        })
    }

    fn sample_request() -> ListingRequest {
        serde_json::from_value(json!({
            "locationDetails": {
                "locationKey": "loc1",
                "name": "Main Warehouse",
            },
            "itemDetails": {
                "sku": "sku1",
                "product": {
                    "title": "Vintage Camera",
                    "description": "A fine vintage camera.",
                },
            },
            "offerDetails": {
                "marketplaceId": "EBAY_US",
                "format": "FIXED_PRICE",
            },
        }))
        .expect("sample request")
    }

    async fn mount_happy_tail(server: &MockServer) {
        Mock::given(method("PUT"))
            .and(path("/sell/inventory/v1/inventory_item/sku1"))
            .respond_with(ResponseTemplate::new(201))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "offerId": "off1" })),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer/off1/publish/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "listingId": "list1" })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn golden_path_creates_and_publishes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        mount_happy_tail(&server).await;

        let response = test_pipeline(&server)
            .run(sample_request())
            .await
            .expect("pipeline run");
        assert_eq!(response.offer_id, "off1");
        assert_eq!(response.listing_id, "list1");

        let names: Vec<&str> = response.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "resolve_location",
                "register_item",
                "create_offer",
                "publish_offer",
            ]
        );
    }

    #[tokio::test]
    async fn existing_location_skips_create() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "merchantLocationKey": "loc1",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;
        mount_happy_tail(&server).await;

        let response = test_pipeline(&server)
            .run(sample_request())
            .await
            .expect("pipeline run");
        assert_eq!(response.listing_id, "list1");
    }

    #[tokio::test]
    async fn absent_location_is_created_once_with_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .and(body_json(json!({
                "locationKey": "loc1",
                "name": "Main Warehouse",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        mount_happy_tail(&server).await;

        test_pipeline(&server)
            .run(sample_request())
            .await
            .expect("pipeline run");
    }

    #[tokio::test]
    async fn offer_sku_is_injected_from_registrar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/sell/inventory/v1/inventory_item/sku1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer"))
            .and(body_json(json!({
                "marketplaceId": "EBAY_US",
                "format": "FIXED_PRICE",
                "sku": "sku1",
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "offerId": "off1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer/off1/publish/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "listingId": "list1" })),
            )
            .mount(&server)
            .await;

        test_pipeline(&server)
            .run(sample_request())
            .await
            .expect("pipeline run");
    }

    #[tokio::test]
    async fn missing_offer_id_halts_before_publish() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/sell/inventory/v1/inventory_item/sku1"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "ok" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/offer/off1/publish/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_pipeline(&server)
            .run(sample_request())
            .await
            .expect_err("must halt");
        assert_eq!(err.stage(), "create_offer");
        assert_eq!(err.kind(), PipelineErrorKind::EmptyResult);
    }

    #[tokio::test]
    async fn ambiguous_lookup_status_is_a_distinct_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broken"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_pipeline(&server)
            .run(sample_request())
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "resolve_location");
        assert_eq!(err.kind(), PipelineErrorKind::Remote);
        assert!(err.detail().contains("location lookup"));
    }

    #[tokio::test]
    async fn failed_item_upsert_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sell/inventory/v1/location/loc1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/sell/inventory/v1/inventory_item/sku1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad aspects"))
            .mount(&server)
            .await;

        let err = test_pipeline(&server)
            .run(sample_request())
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "register_item");
        assert!(err.detail().contains("400"));
        assert!(err.detail().contains("bad aspects"));
    }

    #[tokio::test]
    async fn missing_token_makes_no_calls() {
        let server = MockServer::start().await;
        let pipeline = Pipeline::new(MarketplaceConfig {
            base_url: server.uri(),
            oauth_token: String::new(),
        });

        let err = pipeline
            .run(sample_request())
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "auth");
        assert_eq!(err.kind(), PipelineErrorKind::InvalidInput);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_detail_group_makes_no_calls() {
        let server = MockServer::start().await;
        let mut request = sample_request();
        request.offer_details.clear();

        let err = test_pipeline(&server)
            .run(request)
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "validate");
        assert_eq!(err.kind(), PipelineErrorKind::InvalidInput);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_reported_as_transport() {
        // Nothing listens on this port.
        let pipeline = Pipeline::new(MarketplaceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            oauth_token: "test-token".to_string(),
        });

        let err = pipeline
            .run(sample_request())
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "resolve_location");
        assert_eq!(err.kind(), PipelineErrorKind::Transport);
    }

    #[tokio::test]
    async fn missing_location_key_is_a_precondition_failure() {
        let server = MockServer::start().await;
        let mut request = sample_request();
        request.location_details.remove("locationKey");
        request
            .location_details
            .insert("name".into(), json!("Main Warehouse"));

        let err = test_pipeline(&server)
            .run(request)
            .await
            .expect_err("must fail");
        assert_eq!(err.stage(), "resolve_location");
        assert_eq!(err.kind(), PipelineErrorKind::InvalidInput);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
