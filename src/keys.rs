//! Cache key naming scheme
//!
//! The cache layout (`coin:<id>`, `page:<n>:data`, the update channel) is a
//! contract shared with the websocket tier and any other cache consumer.
//! Keeping it behind one type decouples that contract from the choice of
//! cache backend.

use crate::constants::COIN_UPDATE_CHANNEL;

/// Produces the namespaced cache keys and channel names used by the tracker
#[derive(Debug, Clone, Default)]
pub struct KeyScheme;

impl KeyScheme {
    /// Key holding the full JSON blob for one coin
    pub fn coin(&self, id: &str) -> String {
        format!("coin:{id}")
    }

    /// Key holding the ranked page snapshot (JSON array of coin records)
    pub fn page(&self, page: usize) -> String {
        format!("page:{page}:data")
    }

    /// Pattern matching every page snapshot key
    pub fn page_pattern(&self) -> &'static str {
        "page:*:data"
    }

    /// Pub/sub channel carrying [`crate::types::CoinUpdate`] messages
    pub fn update_channel(&self) -> &'static str {
        COIN_UPDATE_CHANNEL
    }
}
