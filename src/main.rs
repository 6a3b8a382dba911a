mod ebay;
mod http;
mod llm;
mod metrics;
mod models;
mod pipeline;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use llm::GeneratorClient;
use models::{ApiError, ListingRequest, ListingResponse};
use pipeline::{Pipeline, PipelineError, PipelineErrorKind};
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "bazaar.api", "server crashed: {err}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState {
        pipeline: Pipeline::from_env(),
        generator: Arc::new(GeneratorClient::from_env()),
    };

    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/listings", post(create_listing))
        .route("/products", post(create_product))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "bazaar.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    pipeline: Pipeline,
    generator: Arc<GeneratorClient>,
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bazaar-api-rs",
    }))
}

/// Run the listing pipeline: resolve the inventory location, register
/// the item, create the offer, publish it.
///
/// - Method: `POST`
/// - Path: `/listings`
/// - Body: `ListingRequest`
/// - Response: `ListingResponse` (offer id, listing id, stage transcript)
async fn create_listing(
    State(state): State<AppState>,
    Json(payload): Json<ListingRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    metrics::inc_requests("/listings");
    info!(target = "bazaar.api", "listing pipeline invoked");
    let response = state.pipeline.run(payload).await?;
    Ok(Json(response))
}

/// Generation flow: produce a product description for the payload's
/// title, inject it into the item details, then hand the enriched
/// payload to the listing pipeline and relay its response verbatim.
///
/// - Method: `POST`
/// - Path: `/products`
/// - Body: `ListingRequest` (requires `itemDetails.product.title`)
/// - Response: `ListingResponse`
async fn create_product(
    State(state): State<AppState>,
    Json(mut payload): Json<ListingRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    metrics::inc_requests("/products");

    let title = product_title(&payload).ok_or_else(|| {
        AppError::Pipeline(PipelineError::invalid_input(
            "describe_product",
            "itemDetails.product.title is missing",
        ))
    })?;

    let description = state
        .generator
        .describe_product(&title)
        .await
        .map_err(|err| {
            AppError::Pipeline(PipelineError::remote("describe_product", err.to_string()))
        })?;
    info!(target = "bazaar.llm", title = %title, "description generated");
    inject_description(&mut payload, description);

    let response = state.pipeline.run(payload).await?;
    Ok(Json(response))
}

fn product_title(payload: &ListingRequest) -> Option<String> {
    payload
        .item_details
        .get("product")
        .and_then(|product| product.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn inject_description(payload: &mut ListingRequest, description: String) {
    if let Some(Value::Object(product)) = payload.item_details.get_mut("product") {
        product.insert("description".to_string(), Value::String(description));
    }
}

#[derive(Debug)]
enum AppError {
    Pipeline(PipelineError),
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pipeline(err) => {
                let status = match err.kind() {
                    PipelineErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    PipelineErrorKind::Remote
                    | PipelineErrorKind::Transport
                    | PipelineErrorKind::EmptyResult => StatusCode::BAD_GATEWAY,
                };
                let payload = ApiError {
                    error: err.stage().to_string(),
                    detail: Some(err.detail().to_string()),
                };
                (status, Json(payload)).into_response()
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with_title() -> ListingRequest {
        serde_json::from_value(json!({
            "locationDetails": {"locationKey": "loc1"},
            "itemDetails": {"sku": "sku1", "product": {"title": "Vintage Camera"}},
            "offerDetails": {"marketplaceId": "EBAY_US"},
        }))
        .expect("payload")
    }

    #[test]
    fn product_title_reads_nested_field() {
        let payload = payload_with_title();
        assert_eq!(product_title(&payload).as_deref(), Some("Vintage Camera"));
    }

    #[test]
    fn product_title_absent_when_not_a_string() {
        let mut payload = payload_with_title();
        payload
            .item_details
            .insert("product".into(), json!({"title": 42}));
        assert_eq!(product_title(&payload), None);
    }

    #[test]
    fn description_lands_next_to_title() {
        let mut payload = payload_with_title();
        inject_description(&mut payload, "A fine vintage camera.".to_string());
        assert_eq!(
            payload.item_details["product"]["description"],
            json!("A fine vintage camera.")
        );
        assert_eq!(
            payload.item_details["product"]["title"],
            json!("Vintage Camera")
        );
    }
}
