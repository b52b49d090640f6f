//! Error types for the coin tracker

use thiserror::Error;

/// Errors that can occur when fetching market data from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Circuit breaker is open; no network attempt was made
    #[error("Circuit breaker is open")]
    CircuitOpen,
}

/// Errors that can occur against the cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache backend command failed
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Value could not be serialized into a cache blob
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Cache store unreachable or refused the operation
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the persistent snapshot store behind the tracker
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query against the durable store failed
    #[error("Store query failed: {0}")]
    Query(String),
}

/// Errors that can occur while rebuilding the search index
#[derive(Debug, Error)]
pub enum IndexError {
    /// Rebuild source (cache) could not be read
    #[error("Cache error during rebuild: {0}")]
    Cache(#[from] CacheError),

    /// Fallback store query failed
    #[error("Snapshot store error during rebuild: {0}")]
    Store(#[from] StoreError),

    /// Another rebuild holds the guard; this trigger was skipped
    #[error("A rebuild is already in progress")]
    RebuildInProgress,
}

/// Errors reported to search callers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Query was missing, empty, or whitespace-only
    #[error("Missing search query")]
    EmptyQuery,
}

/// Top-level error for tracker cycles
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
