//! CoinGecko market data provider implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    constants::{COINGECKO_API_URL, COINGECKO_MARKETS_ENDPOINT, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
    provider::MarketDataProvider,
    types::CoinRecord,
};

/// Price-change windows requested alongside market fields
const PRICE_CHANGE_WINDOWS: &str = "1h,24h,7d";

/// CoinGecko market data provider
///
/// An API key is optional; when `COINGECKO_API_KEY` is set it is sent as the
/// `x-cg-api-key` header for higher rate limits.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: COINGECKO_API_URL.to_string(),
            api_key: std::env::var("COINGECKO_API_KEY").ok(),
        })
    }

    /// Overrides the API base URL, mainly for tests against a local stub
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_markets(
        &self,
        query: &[(&str, String)],
    ) -> Result<Vec<CoinRecord>, ProviderError> {
        let url = format!("{}{}", self.base_url, COINGECKO_MARKETS_ENDPOINT);

        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-api-key", key);
        }

        let response = request.send().await.map_err(ProviderError::NetworkError)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response.text().await.map_err(ProviderError::NetworkError)?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse markets response: {e}"))
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn market_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<CoinRecord>, ProviderError> {
        self.fetch_markets(&[
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("price_change_percentage", PRICE_CHANGE_WINDOWS.to_string()),
        ])
        .await
    }

    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<CoinRecord>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.fetch_markets(&[
            ("vs_currency", "usd".to_string()),
            ("ids", ids.join(",")),
            ("price_change_percentage", PRICE_CHANGE_WINDOWS.to_string()),
        ])
        .await
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
