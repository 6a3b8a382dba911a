use crate::http::build_client;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("GENERATOR_URL")
                .unwrap_or_else(|_| "http://localhost:3000/generate".into()),
            api_key: std::env::var("GENERATOR_API_KEY").ok(),
            model: std::env::var("GENERATOR_MODEL").ok(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("missing generator endpoint")]
    MissingEndpoint,
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for the description-generation service. One request per call,
/// fixed prompt template, no branching.
pub struct GeneratorClient {
    http: Client,
    config: GeneratorConfig,
}

impl GeneratorClient {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    /// Generates a sales description for a product title. The model
    /// returns a list of content blocks; the first block carries the
    /// text. Embedded line breaks are flattened so the description can
    /// be injected into a single JSON string field.
    pub async fn describe_product(&self, title: &str) -> Result<String, GeneratorError> {
        let endpoint = self.config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(GeneratorError::MissingEndpoint);
        }

        let prompt = format!(
            "Write a product description for {title}. Do not include any extra text or \
             backticks. Do not use inverted commas. Full description, can include \
             marketplace-supported HTML tags."
        );
        let body = GenerateRequest {
            model: self.config.model.clone(),
            max_tokens: 750,
            top_k: 250,
            top_p: 0.999,
            temperature: 1.0,
            stop_sequences: vec![],
            messages: vec![GenerateMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.http.post(endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GeneratorError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(GeneratorError::Http(format!("HTTP {}", response.status())));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GeneratorError::InvalidResponse(err.to_string()))?;
        let text = payload
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| GeneratorError::InvalidResponse("missing content".into()))?;

        Ok(text.replace('\n', " "))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    max_tokens: u32,
    top_k: u32,
    top_p: f64,
    temperature: f64,
    stop_sequences: Vec<String>,
    messages: Vec<GenerateMessage>,
}

#[derive(Debug, Serialize)]
struct GenerateMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}
