use std::env;

const SANDBOX_ROOT: &str = "https://api.sandbox.ebay.com";
const PRODUCTION_ROOT: &str = "https://api.ebay.com";

/// Marketplace connection settings, read once at startup and passed
/// explicitly into the pipeline so tests can point it at a fake server.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Host root, without the `/sell/inventory/v1` base path.
    pub base_url: String,
    /// Bearer token for the inventory API. May be empty; the pipeline
    /// rejects invocations before any network call in that case.
    pub oauth_token: String,
}

impl MarketplaceConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("EBAY_API_BASE").unwrap_or_else(|_| {
            let environment = env::var("EBAY_ENV").unwrap_or_default();
            if environment.eq_ignore_ascii_case("PROD") {
                PRODUCTION_ROOT.to_string()
            } else {
                SANDBOX_ROOT.to_string()
            }
        });
        let oauth_token = env::var("EBAY_OAUTH_TOKEN").unwrap_or_default();
        Self {
            base_url,
            oauth_token,
        }
    }
}
