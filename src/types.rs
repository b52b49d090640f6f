//! Types for the coin tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full market record for a tracked coin
///
/// Deserialized straight from the provider's market listing payload and
/// stored as the per-coin cache blob. Fields other than the identity triple
/// are optional because providers omit them for thinly traded coins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    /// Provider-assigned coin id (e.g. "bitcoin")
    pub id: String,

    /// Display name (e.g. "Bitcoin")
    pub name: String,

    /// Ticker symbol (e.g. "btc")
    pub symbol: String,

    /// Logo URL
    #[serde(default)]
    pub image: String,

    /// Current price in USD
    #[serde(default)]
    pub current_price: Option<f64>,

    /// Market capitalization in USD
    #[serde(default)]
    pub market_cap: Option<f64>,

    /// Rank by market capitalization; missing ranks sort last
    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    /// 24h traded volume in USD
    #[serde(default)]
    pub total_volume: Option<f64>,

    /// 24h price change percentage
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    /// Provider-side last update timestamp
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CoinRecord {
    /// Projects the searchable summary stored in the prefix index
    pub fn summary(&self) -> CoinSummary {
        CoinSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            image: self.image.clone(),
        }
    }
}

/// The unit stored in the prefix index and returned from searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSummary {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
}

/// Fanout message published once per updated coin per populate cycle
///
/// The wire field name `coinId` is part of the channel contract consumed by
/// the websocket tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinUpdate {
    #[serde(rename = "coinId")]
    pub coin_id: String,
    pub data: CoinRecord,
}

/// Result envelope returned by [`crate::search::SearchService`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<CoinSummary>,
}
