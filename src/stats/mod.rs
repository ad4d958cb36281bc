//! Query Stats Tracker
//!
//! Bounded recent-history and frequency counts for incoming queries. The
//! state transition itself is a pure method on `QueryStats`; `StatsTracker`
//! wraps it in a lock so concurrent queries serialize their updates, and
//! persists each new snapshot best-effort through `storage`.

pub mod report;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

pub use report::spawn_daily_report;
pub use storage::StatsStorage;

/// How many recent queries are kept, most recent first.
pub const RECENT_QUERY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    pub recent_queries: Vec<String>,
    pub popular_queries: HashMap<String, u64>,
    pub total_interactions: u64,
}

impl QueryStats {
    /// Record one query: prepend to the bounded recent list, bump its
    /// popularity count, bump the interaction total.
    pub fn record(&mut self, query: &str) {
        self.recent_queries.insert(0, query.to_string());
        self.recent_queries.truncate(RECENT_QUERY_LIMIT);

        *self.popular_queries.entry(query.to_string()).or_insert(0) += 1;
        self.total_interactions += 1;
    }

    /// Top queries by count, descending; ties break alphabetically so the
    /// report is stable.
    pub fn top_queries(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .popular_queries
            .iter()
            .map(|(query, count)| (query.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

#[derive(Clone)]
pub struct StatsTracker {
    state: Arc<RwLock<QueryStats>>,
    storage: Option<Arc<StatsStorage>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(QueryStats::default())),
            storage: None,
        }
    }

    /// Track with durable state: seeds from the stored snapshot (if any) and
    /// writes back after every recorded query.
    pub async fn with_storage(storage: StatsStorage) -> Self {
        let initial = match storage.load().await {
            Ok(Some(stats)) => stats,
            Ok(None) => QueryStats::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load stored query stats, starting fresh");
                QueryStats::default()
            }
        };

        Self {
            state: Arc::new(RwLock::new(initial)),
            storage: Some(Arc::new(storage)),
        }
    }

    /// Record a query. Runs before the pipeline so a query counts even when
    /// processing later fails; storage failures only warn.
    pub async fn record_query(&self, query: &str) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.record(query);
            state.clone()
        };

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(&snapshot).await {
                warn!(error = %e, "Failed to persist query stats");
            }
        }
    }

    pub async fn snapshot(&self) -> QueryStats {
        self.state.read().await.clone()
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_bounds_recent_queries_to_ten() {
        let mut stats = QueryStats::default();
        for i in 0..15 {
            stats.record(&format!("query {i}"));
        }

        assert_eq!(stats.recent_queries.len(), RECENT_QUERY_LIMIT);
        // Most recent first, oldest five dropped.
        assert_eq!(stats.recent_queries[0], "query 14");
        assert_eq!(stats.recent_queries[9], "query 5");
        assert_eq!(stats.total_interactions, 15);
    }

    #[test]
    fn test_record_counts_repeats_exactly() {
        let mut stats = QueryStats::default();
        stats.record("the flood");
        stats.record("the last supper");
        stats.record("the flood");
        stats.record("the flood");

        assert_eq!(stats.popular_queries["the flood"], 3);
        assert_eq!(stats.popular_queries["the last supper"], 1);
        assert_eq!(stats.total_interactions, 4);
    }

    #[test]
    fn test_top_queries_sorted_and_truncated() {
        let mut stats = QueryStats::default();
        for _ in 0..3 {
            stats.record("a");
        }
        for _ in 0..5 {
            stats.record("b");
        }
        stats.record("c");

        let top = stats.top_queries(2);
        assert_eq!(top, vec![("b".to_string(), 5), ("a".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_tracker_serializes_concurrent_records() {
        let tracker = StatsTracker::new();
        let mut handles = Vec::new();
        for _ in 0..20 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker.record_query("the nativity").await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = tracker.snapshot().await;
        assert_eq!(stats.popular_queries["the nativity"], 20);
        assert_eq!(stats.total_interactions, 20);
        assert_eq!(stats.recent_queries.len(), RECENT_QUERY_LIMIT);
    }
}
