//! Per-session load and query latency statistics.

use serde::Serialize;

use crate::query::IMPLEMENTATION;

/// Raw metrics recorded against one session. Query durations accumulate
/// for the lifetime of the session; load figures reflect the last append.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    load_time_ms: u64,
    row_count: usize,
    query_times_ms: Vec<u64>,
}

impl SessionMetrics {
    pub fn record_load(&mut self, duration_ms: u64, row_count: usize) {
        self.load_time_ms = duration_ms;
        self.row_count = row_count;
    }

    pub fn record_query(&mut self, duration_ms: u64) {
        self.query_times_ms.push(duration_ms);
    }

    /// Derives the statistics clients see. All-zero when nothing has been
    /// recorded yet.
    pub fn report(&self) -> MetricsReport {
        let total_queries = self.query_times_ms.len();
        let (avg, std_dev, min, max) = if total_queries == 0 {
            (0.0, 0.0, 0, 0)
        } else {
            let sum: u64 = self.query_times_ms.iter().sum();
            let avg = sum as f64 / total_queries as f64;
            let variance = self
                .query_times_ms
                .iter()
                .map(|&t| {
                    let diff = t as f64 - avg;
                    diff * diff
                })
                .sum::<f64>()
                / total_queries as f64;
            let min = self.query_times_ms.iter().copied().min().unwrap_or(0);
            let max = self.query_times_ms.iter().copied().max().unwrap_or(0);
            (avg, variance.sqrt(), min, max)
        };
        MetricsReport {
            load_time_ms: self.load_time_ms,
            row_count: self.row_count,
            total_queries,
            avg_query_time_ms: round2(avg),
            std_dev_query_time_ms: round2(std_dev),
            min_query_time_ms: min,
            max_query_time_ms: max,
            implementation: IMPLEMENTATION.to_string(),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Statistics for one session, serialized for clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub load_time_ms: u64,
    pub row_count: usize,
    pub total_queries: usize,
    pub avg_query_time_ms: f64,
    pub std_dev_query_time_ms: f64,
    pub min_query_time_ms: u64,
    pub max_query_time_ms: u64,
    pub implementation: String,
}
