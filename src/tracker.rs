//! Coin tracker orchestration
//!
//! Wires the fetcher, populator, index builder, and search service together
//! and drives the three background cycles: top-coins fetch-and-populate,
//! watchlist backfill, and index rebuild. Each cycle is an independent task;
//! a failing cycle logs and waits for its next tick, it never takes the
//! process down.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheStore, KeyedCache},
    constants::{
        INDEX_REBUILD_INTERVAL_SECS, REFRESH_INTERVAL_SECS, WATCHLIST_BATCH_PAUSE_MS,
        WATCHLIST_BATCH_SIZE, WATCHLIST_REFRESH_INTERVAL_SECS, WATCHLIST_TTL_SECS,
    },
    error::{IndexError, SearchError, TrackerError},
    fetcher::PriceFetcher,
    index::{IndexBuilder, IndexHandle},
    keys::KeyScheme,
    metrics::{MetricsCollector, TrackerMetrics},
    populator::CachePopulator,
    provider::MarketDataProvider,
    search::SearchService,
    store::SnapshotStore,
    types::{CoinRecord, SearchResponse},
};

/// Cycle intervals for a [`CoinTracker`]
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between top-coins fetch-and-populate cycles
    pub refresh_interval: Duration,
    /// Interval between watchlist backfill cycles
    pub watchlist_interval: Duration,
    /// Interval between index rebuilds
    pub rebuild_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            watchlist_interval: Duration::from_secs(WATCHLIST_REFRESH_INTERVAL_SECS),
            rebuild_interval: Duration::from_secs(INDEX_REBUILD_INTERVAL_SECS),
        }
    }
}

/// The tracking service: cache pipeline, search index, and read-side access
pub struct CoinTracker {
    cache: Arc<KeyedCache>,
    fetcher: PriceFetcher,
    populator: CachePopulator,
    builder: IndexBuilder,
    search: SearchService,
    snapshots: Arc<dyn SnapshotStore>,
    metrics: Arc<MetricsCollector>,
    config: TrackerConfig,
}

impl CoinTracker {
    pub fn new(
        store: Arc<dyn CacheStore>,
        snapshots: Arc<dyn SnapshotStore>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self::with_config(store, snapshots, provider, TrackerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn CacheStore>,
        snapshots: Arc<dyn SnapshotStore>,
        provider: Arc<dyn MarketDataProvider>,
        config: TrackerConfig,
    ) -> Self {
        let cache = Arc::new(KeyedCache::new(store, KeyScheme::default()));
        let metrics = Arc::new(MetricsCollector::new(provider.provider_name()));
        let handle = Arc::new(IndexHandle::new());

        Self {
            fetcher: PriceFetcher::new(provider, metrics.clone()),
            populator: CachePopulator::new(cache.clone()),
            builder: IndexBuilder::new(cache.clone(), snapshots.clone(), handle.clone()),
            search: SearchService::new(handle),
            cache,
            snapshots,
            metrics,
            config,
        }
    }

    /// Starts the three background cycles
    ///
    /// Each loop runs its cycle immediately, then ticks on its own interval,
    /// so the index is built once at startup without waiting a full period.
    pub fn start(self: &Arc<Self>) {
        let tracker = self.clone();
        tokio::spawn(async move {
            info!(
                interval_secs = tracker.config.refresh_interval.as_secs(),
                "starting top coins refresh task"
            );
            loop {
                if let Err(e) = tracker.refresh_top_coins().await {
                    warn!(error = %e, "top coins refresh failed");
                }
                sleep(tracker.config.refresh_interval).await;
            }
        });

        let tracker = self.clone();
        tokio::spawn(async move {
            info!(
                interval_secs = tracker.config.watchlist_interval.as_secs(),
                "starting watchlist refresh task"
            );
            loop {
                if let Err(e) = tracker.refresh_watchlist().await {
                    warn!(error = %e, "watchlist refresh failed");
                }
                sleep(tracker.config.watchlist_interval).await;
            }
        });

        let tracker = self.clone();
        tokio::spawn(async move {
            info!(
                interval_secs = tracker.config.rebuild_interval.as_secs(),
                "starting index rebuild task"
            );
            loop {
                if let Err(e) = tracker.rebuild_index().await {
                    warn!(error = %e, "index rebuild failed");
                }
                sleep(tracker.config.rebuild_interval).await;
            }
        });
    }

    /// One top-coins cycle: fetch the ranked universe, persist snapshots,
    /// populate the cache, fan out updates
    pub async fn refresh_top_coins(&self) -> Result<usize, TrackerError> {
        let coins = self.fetcher.top_coins().await?;

        // snapshot persistence is best-effort; the cache write is what matters
        if let Err(e) = self.snapshots.save_snapshots(&coins).await {
            warn!(error = %e, "failed to persist price snapshots");
        }

        let cached = self.populator.populate(&coins).await?;
        self.metrics.record_populate(cached).await;
        Ok(cached)
    }

    /// One watchlist cycle: backfill watchlisted coins missing from the cache
    ///
    /// Missing ids are fetched in batches with a pause in between to respect
    /// provider rate limits. A failed batch is logged and skipped; the rest
    /// of the cycle continues.
    pub async fn refresh_watchlist(&self) -> Result<usize, TrackerError> {
        let ids = self.snapshots.watchlisted_ids().await?;
        if ids.is_empty() {
            debug!("no watchlisted coins to refresh");
            return Ok(0);
        }

        let missing = self.cache.missing_coin_ids(&ids).await?;
        if missing.is_empty() {
            debug!("all watchlisted coins already cached");
            return Ok(0);
        }
        info!(missing = missing.len(), "backfilling watchlisted coins");

        let mut refreshed = 0;
        let mut batches = missing.chunks(WATCHLIST_BATCH_SIZE).peekable();
        while let Some(batch) = batches.next() {
            match self.fetcher.coins_by_ids(batch).await {
                Ok(coins) if coins.is_empty() => {
                    warn!(ids = ?batch, "no data returned for watchlist batch");
                }
                Ok(coins) => {
                    refreshed += self
                        .populator
                        .cache_coins(&coins, WATCHLIST_TTL_SECS)
                        .await?;
                }
                Err(e) => {
                    warn!(error = %e, "watchlist batch fetch failed");
                }
            }

            if batches.peek().is_some() {
                sleep(Duration::from_millis(WATCHLIST_BATCH_PAUSE_MS)).await;
            }
        }
        Ok(refreshed)
    }

    /// One index rebuild; a trigger that lands during an active rebuild is
    /// skipped, not queued
    pub async fn rebuild_index(&self) -> Result<usize, TrackerError> {
        match self.builder.rebuild().await {
            Ok(entries) => {
                self.metrics.record_rebuild(entries).await;
                Ok(entries)
            }
            Err(IndexError::RebuildInProgress) => {
                debug!("index rebuild already in progress, skipping trigger");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Prefix search against the current index generation
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        self.search.search(query).await
    }

    pub async fn search_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResponse, SearchError> {
        self.search.search_with_limit(query, limit).await
    }

    /// Reads one coin's cached record
    pub async fn coin(&self, id: &str) -> Result<Option<CoinRecord>, TrackerError> {
        Ok(self.cache.coin(id).await?)
    }

    /// Reads one ranked page snapshot
    pub async fn page(&self, page: usize) -> Result<Option<Vec<CoinRecord>>, TrackerError> {
        Ok(self.cache.page(page).await?)
    }

    /// Current index generation handle, for embedding in other services
    pub fn index(&self) -> Arc<IndexHandle> {
        self.builder.handle()
    }

    pub fn provider_name(&self) -> &'static str {
        self.fetcher.provider_name()
    }

    pub async fn metrics(&self) -> TrackerMetrics {
        self.metrics.snapshot().await
    }
}
