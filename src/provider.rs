//! Provider abstraction for fetching market data from external APIs

use async_trait::async_trait;

use crate::{error::ProviderError, types::CoinRecord};

/// Trait for market data providers
///
/// Implementations fetch coin listings with market fields from an external
/// source (CoinGecko by default).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one ranked page of the market listing
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `per_page` - number of coins per page
    async fn market_page(&self, page: u32, per_page: u32) -> Result<Vec<CoinRecord>, ProviderError>;

    /// Fetches market records for a specific set of coin ids
    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<CoinRecord>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
