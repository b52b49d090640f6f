//! Tracker health metrics collection and reporting
//!
//! Tracks provider latency and success rates plus cycle-level counters for
//! the populate and rebuild loops.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Maximum number of samples kept for latency percentiles
const MAX_SAMPLES: usize = 100;

/// Point-in-time snapshot of tracker health
#[derive(Debug, Clone, Serialize)]
pub struct TrackerMetrics {
    /// Name of the market data provider
    pub provider_name: String,
    /// 50th percentile provider latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile provider latency in milliseconds
    pub latency_p99_ms: f64,
    /// Provider success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total provider requests tracked
    pub total_requests: u64,
    /// Failed provider requests
    pub failed_requests: u64,
    /// Coins cached by the most recent populate cycle
    pub coins_cached: u64,
    /// When the cache was last populated
    pub last_populated: Option<DateTime<Utc>>,
    /// Completed index rebuilds
    pub index_rebuilds: u64,
    /// Entries in the most recent index generation
    pub index_entries: u64,
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Default)]
struct Inner {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
    coins_cached: u64,
    last_populated: Option<DateTime<Utc>>,
    index_rebuilds: u64,
    index_entries: u64,
}

/// Collects and computes tracker metrics
pub struct MetricsCollector {
    provider_name: String,
    inner: RwLock<Inner>,
}

impl MetricsCollector {
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Records one provider request with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut inner = self.inner.write().await;
        inner.total_requests += 1;
        if !success {
            inner.failed_requests += 1;
        }
        if inner.samples.len() >= MAX_SAMPLES {
            inner.samples.pop_front();
        }
        inner.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Records the outcome of a populate cycle
    pub async fn record_populate(&self, coins_cached: usize) {
        let mut inner = self.inner.write().await;
        inner.coins_cached = coins_cached as u64;
        inner.last_populated = Some(Utc::now());
    }

    /// Records a completed index rebuild
    pub async fn record_rebuild(&self, entries: usize) {
        let mut inner = self.inner.write().await;
        inner.index_rebuilds += 1;
        inner.index_entries = entries as u64;
    }

    /// Computes a snapshot from collected samples
    pub async fn snapshot(&self) -> TrackerMetrics {
        let inner = self.inner.read().await;

        let mut latencies: Vec<f64> = inner
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if inner.total_requests > 0 {
            (inner.total_requests - inner.failed_requests) as f64 / inner.total_requests as f64
        } else {
            1.0
        };

        TrackerMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: inner.total_requests,
            failed_requests: inner.failed_requests,
            coins_cached: inner.coins_cached,
            last_populated: inner.last_populated,
            index_rebuilds: inner.index_rebuilds,
            index_entries: inner.index_entries,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_request_outcomes() {
        let collector = MetricsCollector::new("test");

        collector
            .record_request(Duration::from_millis(100), true)
            .await;
        collector
            .record_request(Duration::from_millis(200), true)
            .await;
        collector
            .record_request(Duration::from_millis(150), false)
            .await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.provider_name, "test");
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[tokio::test]
    async fn tracks_cycle_counters() {
        let collector = MetricsCollector::new("test");

        collector.record_populate(100).await;
        collector.record_rebuild(200).await;
        collector.record_rebuild(220).await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.coins_cached, 100);
        assert!(metrics.last_populated.is_some());
        assert_eq!(metrics.index_rebuilds, 2);
        assert_eq!(metrics.index_entries, 220);
    }

    #[test]
    fn percentile_of_sorted_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        // index math rounds half up: 0.5 * 9 -> index 5
        assert_eq!(percentile(&values, 50.0), 6.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
