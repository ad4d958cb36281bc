//! Stats Storage
//!
//! Plain JSON file persistence for the query stats snapshot, so popularity
//! counts survive restarts. Lives in an XDG-style data directory unless the
//! configuration points elsewhere.

use crate::stats::QueryStats;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

const STATS_FILE: &str = "query_stats.json";

pub struct StatsStorage {
    stats_path: PathBuf,
}

impl StatsStorage {
    pub fn new() -> Self {
        let base_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".local/share"))
                    .unwrap_or_else(|_| PathBuf::from("."))
            })
            .join("iconograph");

        Self {
            stats_path: base_dir.join(STATS_FILE),
        }
    }

    /// Storage rooted at a custom directory (Docker, tests).
    pub fn with_path(base_dir: PathBuf) -> Self {
        Self {
            stats_path: base_dir.join(STATS_FILE),
        }
    }

    async fn ensure_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.stats_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    pub async fn load(&self) -> anyhow::Result<Option<QueryStats>> {
        if !self.stats_path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.stats_path).await?;
        let stats: QueryStats = serde_json::from_slice(&data)?;
        info!(
            total_interactions = stats.total_interactions,
            "Loaded stored query stats"
        );
        Ok(Some(stats))
    }

    pub async fn save(&self, stats: &QueryStats) -> anyhow::Result<()> {
        self.ensure_dir().await?;
        let data = serde_json::to_vec_pretty(stats)?;
        fs::write(&self.stats_path, data).await?;
        Ok(())
    }
}

impl Default for StatsStorage {
    fn default() -> Self {
        Self::new()
    }
}
