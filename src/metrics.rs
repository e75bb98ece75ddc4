//! Fetch metrics per concern
//!
//! Tracks latency percentiles, success rate and how many responses were
//! dropped because a newer request superseded them.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::constants::MAX_METRIC_SAMPLES;
use crate::types::Concern;

/// Snapshot of one concern's metrics
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMetrics {
    pub concern: Concern,
    /// 50th percentile latency of successful fetches, in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful fetches, in milliseconds
    pub latency_p99_ms: f64,
    /// Successful / settled, 1.0 when nothing settled yet
    pub success_rate: f64,
    /// Requests that settled (success or failure)
    pub settled_requests: u64,
    pub failed_requests: u64,
    /// Requests aborted or whose response arrived after a newer trigger
    pub superseded_requests: u64,
}

#[derive(Debug, Clone, Copy)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    settled: u64,
    failed: u64,
    superseded: u64,
}

/// Collects metrics for one fetch concern
#[derive(Debug)]
pub struct MetricsCollector {
    concern: Concern,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    pub fn new(concern: Concern) -> Self {
        Self {
            concern,
            counters: RwLock::new(Counters::default()),
        }
    }

    /// Records a settled request with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.settled += 1;
        if !success {
            counters.failed += 1;
        }
        if counters.samples.len() >= MAX_METRIC_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Records a request whose result was discarded
    pub async fn record_superseded(&self) {
        self.counters.write().await.superseded += 1;
    }

    /// Computes current metrics from collected samples
    pub async fn snapshot(&self) -> FetchMetrics {
        let counters = self.counters.read().await;

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if counters.settled > 0 {
            (counters.settled - counters.failed) as f64 / counters.settled as f64
        } else {
            1.0
        };

        FetchMetrics {
            concern: self.concern,
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            settled_requests: counters.settled,
            failed_requests: counters.failed,
            superseded_requests: counters.superseded,
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
