//! Analytics Report
//!
//! Daily background task that reads a stats snapshot and logs the ten most
//! popular queries. Read-only over the tracker; the pipeline never waits on
//! it.

use crate::stats::{QueryStats, StatsTracker};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const REPORT_TOP_N: usize = 10;

/// Spawn the daily report loop. The first report fires one interval after
/// startup.
pub fn spawn_daily_report(stats: StatsTracker) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = stats.snapshot().await;
            emit_report(&snapshot);
        }
    })
}

fn emit_report(stats: &QueryStats) {
    let top = stats.top_queries(REPORT_TOP_N);
    info!(
        total_interactions = stats.total_interactions,
        distinct_queries = stats.popular_queries.len(),
        "Daily query report"
    );
    for (rank, (query, count)) in top.iter().enumerate() {
        info!(rank = rank + 1, query = %query, count, "Popular query");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reads_snapshot_without_mutating() {
        let mut stats = QueryStats::default();
        stats.record("the last supper");
        stats.record("the last supper");
        stats.record("the flood");

        let before = stats.clone();
        emit_report(&stats);
        assert_eq!(stats.total_interactions, before.total_interactions);
        assert_eq!(stats.popular_queries, before.popular_queries);
    }
}
