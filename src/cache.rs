//! Cache store protocol and read-through wrapper
//!
//! The tracker needs six operations from its remote cache: get, set with
//! TTL, multi-get, pattern enumeration, publish, and subscribe. They are
//! expressed as the [`CacheStore`] trait so the Redis backend stays swappable
//! and the pipeline is testable without a server.
//!
//! [`KeyedCache`] layers the key naming scheme and JSON decoding on top:
//! absence of a key is a miss, never an error, and an unparseable blob is
//! logged and treated as a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::{error::CacheError, keys::KeyScheme, types::CoinRecord};

/// One pending cache write
#[derive(Debug, Clone)]
pub struct CacheWrite {
    pub key: String,
    pub value: String,
    /// Expiry in seconds; `None` means the key does not expire
    pub ttl_secs: Option<u64>,
}

/// A set of writes applied as a single pipelined, atomic batch
///
/// Atomicity matters for the page-pair snapshot: readers must never see page
/// one from a new cycle next to page two from the previous one.
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<CacheWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, key: String, value: String, ttl_secs: Option<u64>) {
        self.entries.push(CacheWrite {
            key,
            value,
            ttl_secs,
        });
    }

    pub fn entries(&self) -> &[CacheWrite] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Minimal protocol the tracker requires from its cache backend
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches a single value; `None` on a miss
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Fetches many values, positionally aligned with `keys`
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Enumerates keys matching a glob pattern
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Applies a batch of writes as one atomic pipeline
    async fn write_batch(&self, batch: WriteBatch) -> Result<(), CacheError>;

    /// Publishes a payload to a fanout channel, returning subscribers reached
    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, CacheError>;

    /// Subscribes to a fanout channel
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, CacheError>;

    /// Writes a single value with optional expiry
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        let mut batch = WriteBatch::new();
        batch.write(key.to_string(), value.to_string(), ttl_secs);
        self.write_batch(batch).await
    }
}

/// Redis-backed cache store
///
/// Commands go through a `ConnectionManager`, which reconnects on failure;
/// pub/sub subscriptions get a dedicated connection per subscriber.
pub struct RedisStore {
    client: Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis; a bad URL or unreachable server is a startup error
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self { client, conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = conn.mget(keys).await?;
        Ok(values)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    async fn write_batch(&self, batch: WriteBatch) -> Result<(), CacheError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for entry in batch.entries() {
            match entry.ttl_secs {
                Some(ttl) => {
                    pipe.set_ex(&entry.key, &entry.value, ttl).ignore();
                }
                None => {
                    pipe.set(&entry.key, &entry.value).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let receivers: u64 = conn.publish(channel, payload).await?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, CacheError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable pub/sub payload");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

/// Typed read-through wrapper over a [`CacheStore`]
pub struct KeyedCache {
    store: Arc<dyn CacheStore>,
    keys: KeyScheme,
}

impl KeyedCache {
    pub fn new(store: Arc<dyn CacheStore>, keys: KeyScheme) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn scheme(&self) -> &KeyScheme {
        &self.keys
    }

    /// Reads one coin's cached record; expiry or absence is a miss
    pub async fn coin(&self, id: &str) -> Result<Option<CoinRecord>, CacheError> {
        let blob = self.store.get(&self.keys.coin(id)).await?;
        Ok(blob.and_then(|blob| decode(&self.keys.coin(id), &blob)))
    }

    /// Reads one ranked page snapshot
    pub async fn page(&self, page: usize) -> Result<Option<Vec<CoinRecord>>, CacheError> {
        let key = self.keys.page(page);
        let blob = self.store.get(&key).await?;
        Ok(blob.and_then(|blob| decode(&key, &blob)))
    }

    /// Reads many coins at once, positionally aligned with `ids`
    pub async fn coins_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<Option<CoinRecord>>, CacheError> {
        let keys: Vec<String> = ids.iter().map(|id| self.keys.coin(id)).collect();
        let blobs = self.store.mget(&keys).await?;
        Ok(keys
            .iter()
            .zip(blobs)
            .map(|(key, blob)| blob.and_then(|blob| decode(key, &blob)))
            .collect())
    }

    /// Ids from `ids` that are absent from the cache and need a backfill
    pub async fn missing_coin_ids(&self, ids: &[String]) -> Result<Vec<String>, CacheError> {
        let cached = self.coins_by_ids(ids).await?;
        Ok(ids
            .iter()
            .zip(cached)
            .filter(|(_, record)| record.is_none())
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Reads every page snapshot present in the cache
    ///
    /// Pages whose blob is missing or unparseable are skipped with a warning
    /// so one bad page cannot poison an index rebuild.
    pub async fn all_pages(&self) -> Result<Vec<Vec<CoinRecord>>, CacheError> {
        let mut keys = self.store.scan_keys(self.keys.page_pattern()).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        // KEYS returns no particular order
        keys.sort();

        let blobs = self.store.mget(&keys).await?;
        let mut pages = Vec::new();
        for (key, blob) in keys.iter().zip(blobs) {
            let Some(blob) = blob else { continue };
            if let Some(coins) = decode::<Vec<CoinRecord>>(key, &blob) {
                pages.push(coins);
            }
        }
        Ok(pages)
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, blob: &str) -> Option<T> {
    match serde_json::from_str(blob) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "treating unparseable cache blob as a miss");
            None
        }
    }
}
