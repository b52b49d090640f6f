//! Constants for the coin tracker
//!
//! All tuning for the fetch, cache, and index cycles is centralized here.
//! Intervals can be overridden per tracker via `TrackerConfig`; everything
//! else is a compile-time constant.

/// Number of coins per cached page snapshot
pub const COINS_PER_PAGE: usize = 50;

/// Number of ranked market pages fetched and cached per cycle
pub const TOP_PAGES: usize = 2;

/// TTL for per-coin cache entries written by the top-coins cycle (in seconds)
pub const COIN_TTL_SECS: u64 = 300;

/// TTL for per-coin cache entries written by the watchlist backfill (in seconds)
pub const WATCHLIST_TTL_SECS: u64 = 600;

/// Maximum number of coin ids per watchlist provider request
pub const WATCHLIST_BATCH_SIZE: usize = 25;

/// Pause between watchlist batches to stay inside provider rate limits (in milliseconds)
pub const WATCHLIST_BATCH_PAUSE_MS: u64 = 2000;

/// How often the top-coins fetch-and-populate cycle runs (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 120;

/// How often the watchlist backfill cycle runs (in seconds)
pub const WATCHLIST_REFRESH_INTERVAL_SECS: u64 = 300;

/// How often the search index is rebuilt from cached pages (in seconds)
pub const INDEX_REBUILD_INTERVAL_SECS: u64 = 600;

/// HTTP request timeout for a single provider call (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retry attempts when a provider call fails
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay for retries (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay for retries (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Consecutive provider failures before the circuit breaker opens
pub const BREAKER_FAILURE_THRESHOLD: u32 = 3;

/// How long the breaker stays open before allowing a trial call (in seconds)
pub const BREAKER_COOLDOWN_SECS: u64 = 60;

/// Default number of results returned by a prefix search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Pub/sub channel carrying per-coin update messages
pub const COIN_UPDATE_CHANNEL: &str = "coin-updates";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko endpoint for paged market listings
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-tracker-sdk/0.1.0";
