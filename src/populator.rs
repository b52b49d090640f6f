//! Cache population pipeline
//!
//! Takes a freshly fetched batch of coin records and turns it into cache
//! state: two ranked page snapshots plus one TTL'd entry per coin, written
//! as a single atomic pipeline, followed by one fanout message per coin.
//!
//! The write always completes before any notification goes out, so a
//! subscriber reacting to a message finds consistent data in the cache.
//! Publishing is best-effort: a failed publish is logged and never rolls
//! back the write.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    cache::{KeyedCache, WriteBatch},
    constants::{COINS_PER_PAGE, COIN_TTL_SECS, TOP_PAGES},
    error::CacheError,
    types::{CoinRecord, CoinUpdate},
};

/// Writes fetched market data into the cache and fans out updates
pub struct CachePopulator {
    cache: Arc<KeyedCache>,
    page_size: usize,
}

impl CachePopulator {
    pub fn new(cache: Arc<KeyedCache>) -> Self {
        Self {
            cache,
            page_size: COINS_PER_PAGE,
        }
    }

    /// Overrides the page size, mainly for tests
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Caches a fetched batch and publishes one update per coin
    ///
    /// Coins are ranked by market cap (missing ranks last) and sliced into
    /// TOP_PAGES page snapshots. Returns the number of coins cached.
    pub async fn populate(&self, coins: &[CoinRecord]) -> Result<usize, CacheError> {
        if coins.is_empty() {
            warn!("no coin data to cache");
            return Ok(0);
        }

        let mut ranked: Vec<&CoinRecord> = coins.iter().collect();
        ranked.sort_by_key(|coin| coin.market_cap_rank.unwrap_or(u32::MAX));

        let scheme = self.cache.scheme();
        let mut batch = WriteBatch::new();
        // every page key is rewritten each cycle, padded with an empty array
        // when the batch runs short, so no stale page snapshot survives
        let mut chunks = ranked.chunks(self.page_size);
        for page in 1..=TOP_PAGES {
            let chunk = chunks.next().unwrap_or(&[]);
            batch.write(scheme.page(page), serde_json::to_string(chunk)?, None);
        }
        for coin in coins {
            batch.write(
                scheme.coin(&coin.id),
                serde_json::to_string(coin)?,
                Some(COIN_TTL_SECS),
            );
        }

        self.cache.store().write_batch(batch).await?;
        info!(coins = coins.len(), "cached coin entries and page snapshots");

        // fanout only after the write is confirmed
        let channel = scheme.update_channel();
        let mut reached = 0u64;
        for coin in coins {
            let update = CoinUpdate {
                coin_id: coin.id.clone(),
                data: coin.clone(),
            };
            let payload = match serde_json::to_string(&update) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(coin = %coin.id, error = %e, "failed to encode coin update");
                    continue;
                }
            };
            match self.cache.store().publish(channel, &payload).await {
                Ok(subscribers) => reached += subscribers,
                Err(e) => {
                    warn!(coin = %coin.id, error = %e, "failed to publish coin update");
                }
            }
        }
        debug!(
            coins = coins.len(),
            subscribers = reached,
            channel,
            "published coin updates"
        );

        Ok(coins.len())
    }

    /// Caches per-coin entries only, without page snapshots or fanout
    ///
    /// Used by the watchlist backfill, which refreshes individual coins
    /// outside the ranked universe.
    pub async fn cache_coins(
        &self,
        coins: &[CoinRecord],
        ttl_secs: u64,
    ) -> Result<usize, CacheError> {
        if coins.is_empty() {
            return Ok(0);
        }

        let scheme = self.cache.scheme();
        let mut batch = WriteBatch::new();
        for coin in coins {
            batch.write(
                scheme.coin(&coin.id),
                serde_json::to_string(coin)?,
                Some(ttl_secs),
            );
        }
        self.cache.store().write_batch(batch).await?;

        debug!(coins = coins.len(), ttl_secs, "cached coin entries");
        Ok(coins.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::mock::{MemoryStore, MockOp};
    use crate::cache::CacheStore;
    use crate::constants::WATCHLIST_TTL_SECS;
    use crate::keys::KeyScheme;
    use crate::types::fixtures::record;

    fn setup() -> (Arc<MemoryStore>, CachePopulator) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(KeyedCache::new(store.clone(), KeyScheme::default()));
        (store, CachePopulator::new(cache))
    }

    #[tokio::test]
    async fn slices_pages_by_rank() {
        let (store, populator) = setup();
        let populator = populator.with_page_size(1);

        // deliberately out of rank order
        let coins = vec![
            record("ethereum", "Ethereum", "eth", Some(2)),
            record("bitcoin", "Bitcoin", "btc", Some(1)),
        ];
        populator.populate(&coins).await.unwrap();

        let page1: Vec<CoinRecord> =
            serde_json::from_str(&store.entry("page:1:data").unwrap()).unwrap();
        let page2: Vec<CoinRecord> =
            serde_json::from_str(&store.entry("page:2:data").unwrap()).unwrap();

        assert_eq!(page1.len(), 1);
        assert_eq!(page1[0].id, "bitcoin");
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].id, "ethereum");
    }

    #[tokio::test]
    async fn short_cycle_clears_stale_page_snapshots() {
        let (store, populator) = setup();
        let populator = populator.with_page_size(1);

        let coins = vec![
            record("bitcoin", "Bitcoin", "btc", Some(1)),
            record("ethereum", "Ethereum", "eth", Some(2)),
        ];
        populator.populate(&coins).await.unwrap();

        // the next cycle fills only page one; page two must not keep
        // last cycle's ethereum blob
        let coins = vec![record("bitcoin", "Bitcoin", "btc", Some(1))];
        populator.populate(&coins).await.unwrap();

        let page2: Vec<CoinRecord> =
            serde_json::from_str(&store.entry("page:2:data").unwrap()).unwrap();
        assert!(page2.is_empty());
    }

    #[tokio::test]
    async fn missing_ranks_sort_last() {
        let (store, populator) = setup();
        let populator = populator.with_page_size(1);

        let coins = vec![
            record("unranked", "Unranked", "unr", None),
            record("bitcoin", "Bitcoin", "btc", Some(1)),
        ];
        populator.populate(&coins).await.unwrap();

        let page1: Vec<CoinRecord> =
            serde_json::from_str(&store.entry("page:1:data").unwrap()).unwrap();
        assert_eq!(page1[0].id, "bitcoin");
    }

    #[tokio::test]
    async fn entity_entries_expire_but_pages_do_not() {
        let (store, populator) = setup();

        let coins = vec![record("bitcoin", "Bitcoin", "btc", Some(1))];
        populator.populate(&coins).await.unwrap();

        assert_eq!(store.ttl("coin:bitcoin"), Some(COIN_TTL_SECS));
        assert_eq!(store.ttl("page:1:data"), None);
    }

    #[tokio::test]
    async fn writes_complete_before_any_notification() {
        let (store, populator) = setup();

        let coins = vec![
            record("bitcoin", "Bitcoin", "btc", Some(1)),
            record("ethereum", "Ethereum", "eth", Some(2)),
        ];
        populator.populate(&coins).await.unwrap();

        let ops = store.ops();
        let first_publish = ops
            .iter()
            .position(|op| matches!(op, MockOp::Publish(_)))
            .expect("no notifications published");
        let last_write = ops
            .iter()
            .rposition(|op| matches!(op, MockOp::Write(_)))
            .expect("no writes recorded");
        assert!(last_write < first_publish);

        let publishes = ops
            .iter()
            .filter(|op| matches!(op, MockOp::Publish(_)))
            .count();
        assert_eq!(publishes, 2);
    }

    #[tokio::test]
    async fn update_payload_carries_coin_id_and_data() {
        let (store, populator) = setup();
        let mut updates = store.subscribe("coin-updates").await.unwrap();

        let coins = vec![record("bitcoin", "Bitcoin", "btc", Some(1))];
        populator.populate(&coins).await.unwrap();

        let payload = updates.recv().await.unwrap();
        let update: CoinUpdate = serde_json::from_str(&payload).unwrap();
        assert_eq!(update.coin_id, "bitcoin");
        assert_eq!(update.data.id, "bitcoin");
        assert!(payload.contains("\"coinId\""));
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_cycle() {
        let (store, populator) = setup();
        store.fail_publishes();

        let coins = vec![record("bitcoin", "Bitcoin", "btc", Some(1))];
        let cached = populator.populate(&coins).await.unwrap();

        assert_eq!(cached, 1);
        assert!(store.entry("coin:bitcoin").is_some());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let (store, populator) = setup();
        assert_eq!(populator.populate(&[]).await.unwrap(), 0);
        assert!(store.ops().is_empty());
    }

    #[tokio::test]
    async fn cache_coins_uses_the_given_ttl_without_fanout() {
        let (store, populator) = setup();

        let coins = vec![record("solana", "Solana", "sol", Some(5))];
        populator
            .cache_coins(&coins, WATCHLIST_TTL_SECS)
            .await
            .unwrap();

        assert_eq!(store.ttl("coin:solana"), Some(WATCHLIST_TTL_SECS));
        assert!(store.entry("page:1:data").is_none());
        assert!(!store
            .ops()
            .iter()
            .any(|op| matches!(op, MockOp::Publish(_))));
    }
}
