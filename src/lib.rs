//! # Coin Tracker SDK
//!
//! Keeps a cryptocurrency market universe warm in Redis and searchable by
//! name or ticker prefix. A background pipeline fetches ranked market pages
//! from CoinGecko, caches them as page snapshots plus per-coin entries,
//! fans out pub/sub updates, and periodically rebuilds an in-memory prefix
//! index that serves searches without touching the cache.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use coin_tracker_sdk::{
//!     CoinTracker, CoinGeckoProvider, NoopSnapshotStore, RedisStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1/").await?);
//! let tracker = Arc::new(CoinTracker::new(
//!     store,
//!     Arc::new(NoopSnapshotStore),
//!     Arc::new(CoinGeckoProvider::new()?),
//! ));
//!
//! // Spawn the refresh, watchlist, and index rebuild loops
//! tracker.start();
//!
//! let response = tracker.search("bit").await?;
//! for coin in response.results {
//!     println!("{} ({})", coin.name, coin.symbol);
//! }
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod cache;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod keys;
pub mod metrics;
pub mod populator;
pub mod provider;
pub mod providers;
pub mod search;
pub mod store;
pub mod tracker;
pub mod trie;
pub mod types;

// Re-export commonly used types
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use cache::{CacheStore, KeyedCache, RedisStore};
pub use error::{CacheError, IndexError, ProviderError, SearchError, StoreError, TrackerError};
pub use fetcher::PriceFetcher;
pub use index::{IndexBuilder, IndexHandle};
pub use metrics::TrackerMetrics;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoProvider;
pub use search::SearchService;
pub use store::{NoopSnapshotStore, SnapshotStore};
pub use tracker::{CoinTracker, TrackerConfig};
pub use trie::PrefixIndex;
pub use types::{CoinRecord, CoinSummary, CoinUpdate, SearchResponse};
