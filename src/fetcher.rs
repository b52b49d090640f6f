//! Resilient market data fetching
//!
//! Wraps a [`MarketDataProvider`] with the full call policy: circuit breaker
//! admission, a per-call timeout, and retry with exponential backoff. Every
//! attempt feeds the breaker, so a failing provider trips into fail-fast
//! instead of piling up timeouts; the metrics collector records the outcome
//! and end-to-end latency of each logical call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{
    breaker::CircuitBreaker,
    constants::{
        COINS_PER_PAGE, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRY_ATTEMPTS,
        REQUEST_TIMEOUT_SECS, TOP_PAGES,
    },
    error::ProviderError,
    metrics::MetricsCollector,
    provider::MarketDataProvider,
    types::CoinRecord,
};

enum Request<'a> {
    Page(u32),
    Ids(&'a [String]),
}

/// Fetches market data with retry and breaker protection
pub struct PriceFetcher {
    provider: Arc<dyn MarketDataProvider>,
    breaker: CircuitBreaker,
    metrics: Arc<MetricsCollector>,
}

impl PriceFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::default(),
            metrics,
        }
    }

    /// Replaces the default breaker, mainly for tests with short cooldowns
    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Fetches the fixed top-N universe: TOP_PAGES ranked pages, fetched
    /// concurrently and concatenated in page order
    pub async fn top_coins(&self) -> Result<Vec<CoinRecord>, ProviderError> {
        let pages = try_join_all(
            (1..=TOP_PAGES as u32).map(|page| self.call_with_retry(Request::Page(page))),
        )
        .await?;

        let coins: Vec<CoinRecord> = pages.into_iter().flatten().collect();
        debug!(
            count = coins.len(),
            provider = self.provider.provider_name(),
            "fetched top coin pages"
        );
        Ok(coins)
    }

    /// Fetches the on-demand set (watchlisted coins) by id
    pub async fn coins_by_ids(&self, ids: &[String]) -> Result<Vec<CoinRecord>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.call_with_retry(Request::Ids(ids)).await
    }

    /// One attempt: breaker admission, bounded call, breaker accounting
    async fn call(&self, request: &Request<'_>) -> Result<Vec<CoinRecord>, ProviderError> {
        self.breaker.try_acquire()?;

        let bounded = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), async {
            match request {
                Request::Page(page) => {
                    self.provider
                        .market_page(*page, COINS_PER_PAGE as u32)
                        .await
                }
                Request::Ids(ids) => self.provider.markets_by_ids(ids).await,
            }
        });
        let result = bounded.await.unwrap_or(Err(ProviderError::Timeout));

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }

    async fn call_with_retry(&self, request: Request<'_>) -> Result<Vec<CoinRecord>, ProviderError> {
        let start = Instant::now();
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut last_error = ProviderError::ApiError("no attempts made".to_string());

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            match self.call(&request).await {
                Ok(coins) => {
                    self.metrics.record_request(start.elapsed(), true).await;
                    return Ok(coins);
                }
                // the breaker already decided; retrying would not reach the network
                Err(ProviderError::CircuitOpen) => {
                    self.metrics.record_request(start.elapsed(), false).await;
                    return Err(ProviderError::CircuitOpen);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = MAX_RETRY_ATTEMPTS,
                        provider = self.provider.provider_name(),
                        error = %e,
                        "provider call failed"
                    );
                    last_error = e;
                    if attempt < MAX_RETRY_ATTEMPTS {
                        sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        }

        self.metrics.record_request(start.elapsed(), false).await;
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{CircuitBreakerConfig, CircuitState};
    use crate::provider::mock::MockProvider;
    use crate::types::fixtures::record;

    fn fetcher(provider: Arc<MockProvider>) -> PriceFetcher {
        PriceFetcher::new(provider, Arc::new(MetricsCollector::new("mock")))
    }

    #[tokio::test(start_paused = true)]
    async fn concatenates_pages_in_order() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(1, vec![record("bitcoin", "Bitcoin", "btc", Some(1))]);
        provider.set_page(2, vec![record("tether", "Tether", "usdt", Some(51))]);

        let coins = fetcher(provider).top_coins().await.unwrap();
        let ids: Vec<&str> = coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "tether"]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin(record("solana", "Solana", "sol", Some(5)));
        provider.fail_next(1);

        let coins = fetcher(provider.clone())
            .coins_by_ids(&["solana".to_string()])
            .await
            .unwrap();

        assert_eq!(coins.len(), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn opens_breaker_and_fails_fast() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next(10);
        let fetcher = fetcher(provider.clone());

        // three consecutive failed attempts exhaust the retries and trip the breaker
        let err = fetcher.coins_by_ids(&["solana".to_string()]).await;
        assert!(matches!(err, Err(ProviderError::ApiError(_))));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(fetcher.breaker().state(), CircuitState::Open);

        // within the cooldown window the call fails without a network attempt
        let err = fetcher.coins_by_ids(&["solana".to_string()]).await;
        assert!(matches!(err, Err(ProviderError::CircuitOpen)));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin(record("solana", "Solana", "sol", Some(5)));
        provider.set_delay(Duration::from_secs(REQUEST_TIMEOUT_SECS + 5));

        let fetcher = fetcher(provider.clone()).with_breaker(CircuitBreaker::new(
            CircuitBreakerConfig {
                failure_threshold: 100,
                cooldown: Duration::from_secs(60),
            },
        ));

        let err = fetcher.coins_by_ids(&["solana".to_string()]).await;
        assert!(matches!(err, Err(ProviderError::Timeout)));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_id_set_skips_the_provider() {
        let provider = Arc::new(MockProvider::new());
        let coins = fetcher(provider.clone()).coins_by_ids(&[]).await.unwrap();
        assert!(coins.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
