//! Persistent store seam
//!
//! The platform keeps durable state (price snapshots, watchlists) in a
//! database owned by other services. The tracker only needs three queries
//! from it, expressed as the [`SnapshotStore`] trait; embedders plug in
//! whatever durable tier they run.

use async_trait::async_trait;

use crate::{
    error::StoreError,
    types::{CoinRecord, CoinSummary},
};

/// Durable-store queries consumed by the tracker
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Lists every tracked coin with its searchable fields
    ///
    /// Used as the index rebuild fallback when no page snapshots are cached.
    async fn list_tracked_coins(&self) -> Result<Vec<CoinSummary>, StoreError>;

    /// Ids of all watchlisted coins across users
    async fn watchlisted_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Persists one price snapshot per coin for historical queries
    ///
    /// Best-effort: the tracker logs and continues when this fails.
    async fn save_snapshots(&self, coins: &[CoinRecord]) -> Result<(), StoreError>;
}

/// A [`SnapshotStore`] for embedders without a durable tier
///
/// Lists nothing, watches nothing, and drops snapshots. With this store the
/// index rebuild depends entirely on cached page snapshots.
pub struct NoopSnapshotStore;

#[async_trait]
impl SnapshotStore for NoopSnapshotStore {
    async fn list_tracked_coins(&self) -> Result<Vec<CoinSummary>, StoreError> {
        Ok(Vec::new())
    }

    async fn watchlisted_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_snapshots(&self, _coins: &[CoinRecord]) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory snapshot store for tests
    #[derive(Default)]
    pub struct MemorySnapshotStore {
        tracked: Mutex<Vec<CoinSummary>>,
        watchlist: Mutex<Vec<String>>,
        snapshots: Mutex<Vec<CoinRecord>>,
        fail_listing: AtomicBool,
    }

    impl MemorySnapshotStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn track(&self, coin: CoinSummary) {
            self.tracked.lock().unwrap().push(coin);
        }

        pub fn watch(&self, id: &str) {
            self.watchlist.lock().unwrap().push(id.to_string());
        }

        pub fn saved_snapshots(&self) -> Vec<CoinRecord> {
            self.snapshots.lock().unwrap().clone()
        }

        pub fn fail_listing(&self) {
            self.fail_listing.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SnapshotStore for MemorySnapshotStore {
        async fn list_tracked_coins(&self) -> Result<Vec<CoinSummary>, StoreError> {
            if self.fail_listing.load(Ordering::SeqCst) {
                return Err(StoreError::Query("listing failed".to_string()));
            }
            Ok(self.tracked.lock().unwrap().clone())
        }

        async fn watchlisted_ids(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.watchlist.lock().unwrap().clone())
        }

        async fn save_snapshots(&self, coins: &[CoinRecord]) -> Result<(), StoreError> {
            self.snapshots.lock().unwrap().extend_from_slice(coins);
            Ok(())
        }
    }
}
