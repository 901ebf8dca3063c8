//! Resolver metrics
//!
//! Counters only, monotonic. A registry can be shared by the many
//! short-lived resolver instances of a process.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing resolver activity
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    /// Queries turned into filter trees
    queries_resolved: AtomicU64,
    /// Queries rejected with an error
    queries_rejected: AtomicU64,
    /// Attribute lookups served from the instance cache
    attribute_cache_hits: AtomicU64,
    /// Attribute lookups that consulted the registry
    attribute_cache_misses: AtomicU64,
    function_cache_hits: AtomicU64,
    function_cache_misses: AtomicU64,
}

impl ResolverMetrics {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_resolved(&self) {
        self.queries_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attribute_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.attribute_cache_hits
        } else {
            &self.attribute_cache_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_function_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.function_cache_hits
        } else {
            &self.function_cache_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_resolved: self.queries_resolved.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            attribute_cache_hits: self.attribute_cache_hits.load(Ordering::Relaxed),
            attribute_cache_misses: self.attribute_cache_misses.load(Ordering::Relaxed),
            function_cache_hits: self.function_cache_hits.load(Ordering::Relaxed),
            function_cache_misses: self.function_cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ResolverMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_resolved: u64,
    pub queries_rejected: u64,
    pub attribute_cache_hits: u64,
    pub attribute_cache_misses: u64,
    pub function_cache_hits: u64,
    pub function_cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(ResolverMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_lookup_counters() {
        let metrics = ResolverMetrics::new();
        metrics.record_attribute_lookup(false);
        metrics.record_attribute_lookup(true);
        metrics.record_attribute_lookup(true);
        metrics.record_function_lookup(false);
        metrics.increment_queries_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attribute_cache_hits, 2);
        assert_eq!(snapshot.attribute_cache_misses, 1);
        assert_eq!(snapshot.function_cache_misses, 1);
        assert_eq!(snapshot.queries_rejected, 1);
        assert_eq!(snapshot.queries_resolved, 0);
    }
}
