//! Fetch health metrics collection and reporting
//!
//! Tracks latency percentiles and success rates of upstream fetch attempts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Snapshot of fetch metrics
#[derive(Debug, Clone)]
pub struct FetchMetrics {
    /// Name of the provider
    pub provider_name: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of attempts tracked
    pub total_attempts: u64,
    /// Number of failed attempts
    pub failed_attempts: u64,
}

impl FetchMetrics {
    /// Creates metrics with no data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_attempts: 0,
            failed_attempts: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects and computes metrics for a provider
pub struct MetricsCollector {
    provider_name: String,
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector for a provider
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            counters: Arc::new(RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Counters::default()
            })),
        }
    }

    /// Records an attempt with its duration and success status
    pub async fn record_attempt(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total += 1;
        if !success {
            counters.failed += 1;
        }

        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> FetchMetrics {
        let counters = self.counters.read().await;

        if counters.samples.is_empty() {
            return FetchMetrics::empty(&self.provider_name);
        }

        // Percentiles over successful attempts only
        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        FetchMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_attempts: counters.total,
            failed_attempts: counters.failed,
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
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new("test");

        collector.record_attempt(Duration::from_millis(100), true).await;
        collector.record_attempt(Duration::from_millis(200), true).await;
        collector.record_attempt(Duration::from_millis(150), false).await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.provider_name, "test");
        assert_eq!(metrics.total_attempts, 3);
        assert_eq!(metrics.failed_attempts, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let collector = MetricsCollector::new("test");
        for _ in 0..(MAX_SAMPLES + 20) {
            collector.record_attempt(Duration::from_millis(5), true).await;
        }

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_attempts, (MAX_SAMPLES + 20) as u64);
        assert_eq!(collector.counters.read().await.samples.len(), MAX_SAMPLES);
    }

    #[test]
    fn test_percentile() {
        let values: Vec<f64> = (1..=11).map(f64::from).collect();
        assert_eq!(percentile(&values, 50.0), 6.0);
        assert_eq!(percentile(&values, 99.0), 11.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
