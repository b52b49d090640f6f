//! Search index rebuild and publication
//!
//! [`IndexHandle`] owns the currently published [`PrefixIndex`] generation.
//! Readers clone an `Arc` to the frozen generation and are never blocked by
//! a rebuild; the write lock is held only for the pointer swap.
//!
//! [`IndexBuilder`] produces new generations from the cached page snapshots,
//! falling back to the persistent store when nothing is cached. A failed
//! rebuild leaves the previous generation published: stale-but-available
//! beats unavailable.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    cache::KeyedCache,
    error::IndexError,
    store::SnapshotStore,
    trie::PrefixIndex,
    types::CoinSummary,
};

/// Shared handle to the currently published index generation
pub struct IndexHandle {
    current: RwLock<Arc<PrefixIndex>>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    /// Starts with an empty generation, so searches before the first rebuild
    /// simply find nothing
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(PrefixIndex::new())),
        }
    }

    /// Returns the current generation
    pub async fn current(&self) -> Arc<PrefixIndex> {
        self.current.read().await.clone()
    }

    /// Atomically replaces the published generation
    pub async fn publish(&self, index: PrefixIndex) {
        *self.current.write().await = Arc::new(index);
    }
}

/// Rebuilds the prefix index from cache or the fallback store
pub struct IndexBuilder {
    cache: Arc<KeyedCache>,
    store: Arc<dyn SnapshotStore>,
    handle: Arc<IndexHandle>,
    rebuild_guard: Mutex<()>,
}

impl IndexBuilder {
    pub fn new(
        cache: Arc<KeyedCache>,
        store: Arc<dyn SnapshotStore>,
        handle: Arc<IndexHandle>,
    ) -> Self {
        Self {
            cache,
            store,
            handle,
            rebuild_guard: Mutex::new(()),
        }
    }

    pub fn handle(&self) -> Arc<IndexHandle> {
        self.handle.clone()
    }

    /// Builds and publishes a fresh index generation
    ///
    /// Each coin is inserted twice, under its display name and under its
    /// ticker symbol, so a search by either prefix finds the same summary.
    /// Returns the number of entries in the new generation. A concurrent
    /// trigger is skipped with [`IndexError::RebuildInProgress`] rather than
    /// interleaved.
    pub async fn rebuild(&self) -> Result<usize, IndexError> {
        let _guard = self
            .rebuild_guard
            .try_lock()
            .map_err(|_| IndexError::RebuildInProgress)?;

        let mut index = PrefixIndex::new();

        let pages = self.cache.all_pages().await?;
        for page in &pages {
            for coin in page {
                insert_summary(&mut index, coin.summary());
            }
        }

        if index.is_empty() {
            warn!("no cached page snapshots, rebuilding index from the snapshot store");
            for coin in self.store.list_tracked_coins().await? {
                insert_summary(&mut index, coin);
            }
        }

        let entries = index.entry_count();
        self.handle.publish(index).await;
        info!(entries, pages = pages.len(), "search index rebuilt");
        Ok(entries)
    }
}

fn insert_summary(index: &mut PrefixIndex, summary: CoinSummary) {
    let name = summary.name.clone();
    let symbol = summary.symbol.clone();
    index.insert(&name, summary.clone());
    index.insert(&symbol, summary);
}
