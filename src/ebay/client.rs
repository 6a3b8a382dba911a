use crate::ebay::config::MarketplaceConfig;
use crate::http::build_client;
use reqwest::header::{ACCEPT, CONTENT_LANGUAGE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Base path of the inventory API, prepended to every resource path.
const INVENTORY_BASE: &str = "/sell/inventory/v1";

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("oauth token is missing")]
    MissingToken,
    #[error("{operation} failed: {status} - {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("missing `{field}`")]
    MissingField { field: &'static str },
}

/// Raw outcome of a single call: the transport succeeded, the status has
/// not been judged yet. Each stage decides which statuses it accepts.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn unexpected(self, operation: &'static str) -> MarketplaceError {
        MarketplaceError::UnexpectedStatus {
            operation,
            status: self.status,
            body: self.body,
        }
    }
}

/// Issues one authenticated JSON request per call. No retries; a failed
/// call is terminal for the stage that issued it.
#[derive(Clone)]
pub struct MarketplaceClient {
    http: Client,
    config: MarketplaceConfig,
}

impl MarketplaceClient {
    pub fn new(config: MarketplaceConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    pub fn token_present(&self) -> bool {
        !self.config.oauth_token.trim().is_empty()
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, MarketplaceError> {
        self.dispatch(Method::GET, path, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, MarketplaceError> {
        self.dispatch(Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, MarketplaceError> {
        self.dispatch(Method::PUT, path, Some(body)).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, MarketplaceError> {
        if !self.token_present() {
            return Err(MarketplaceError::MissingToken);
        }
        let url = format!("{}{}{}", self.config.base_url, INVENTORY_BASE, path);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.config.oauth_token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_LANGUAGE, "en-US");
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}
