use crate::ports::MetricsSink;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct OpCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// In-process cache hit/miss counters, keyed by operation name.
#[derive(Default)]
pub struct CacheMetrics {
    operations: DashMap<&'static str, OpCounters>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub operation: &'static str,
    pub hits: u64,
    pub misses: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self, operation: &str) -> u64 {
        self.operations
            .get(operation)
            .map_or(0, |c| c.hits.load(Ordering::Relaxed))
    }

    pub fn misses(&self, operation: &str) -> u64 {
        self.operations
            .get(operation)
            .map_or(0, |c| c.misses.load(Ordering::Relaxed))
    }

    /// Current counters, sorted by operation name.
    pub fn snapshot(&self) -> Vec<OperationStats> {
        let mut stats: Vec<OperationStats> = self
            .operations
            .iter()
            .map(|entry| OperationStats {
                operation: *entry.key(),
                hits: entry.hits.load(Ordering::Relaxed),
                misses: entry.misses.load(Ordering::Relaxed),
            })
            .collect();
        stats.sort_by_key(|s| s.operation);
        stats
    }
}

impl MetricsSink for CacheMetrics {
    fn inc_hits(&self, operation: &'static str, count: u64) {
        self.operations
            .entry(operation)
            .or_default()
            .hits
            .fetch_add(count, Ordering::Relaxed);
    }

    fn inc_misses(&self, operation: &'static str, count: u64) {
        self.operations
            .entry(operation)
            .or_default()
            .misses
            .fetch_add(count, Ordering::Relaxed);
    }
}
