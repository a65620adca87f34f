use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    last_processed_index: i64,
    last_updated: DateTime<Utc>,
}

/// Durable record of the last list position fully attempted.
///
/// `last_processed_index` is -1 when nothing has been processed yet, so the
/// resume position is always `last_processed_index + 1`. A CAPTCHA halt at
/// position k is saved as k - 1, which makes k the next position retried.
///
/// Precondition: at most one runner instance per checkpoint file; no lock
/// is taken.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last fully processed index, or -1 when no usable checkpoint exists.
    /// Read errors are non-fatal: a missing or corrupt file means "start
    /// from the beginning".
    pub async fn load(&self) -> i64 {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(_) => return -1,
        };

        match serde_json::from_slice::<Checkpoint>(&bytes) {
            Ok(cp) => {
                info!(index = cp.last_processed_index, "resuming from saved progress");
                cp.last_processed_index
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "progress file unreadable, starting from beginning");
                -1
            }
        }
    }

    /// First list position the next run should process.
    pub async fn next_index(&self) -> usize {
        (self.load().await + 1).max(0) as usize
    }

    /// Persist the checkpoint. Writes to a temp file and renames it into
    /// place so a crash mid-write never clobbers committed progress.
    pub async fn save(&self, last_processed_index: i64) -> anyhow::Result<()> {
        let checkpoint = Checkpoint {
            last_processed_index,
            last_updated: Utc::now(),
        };
        let body = serde_json::to_vec_pretty(&checkpoint)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &body)
            .await
            .with_context(|| format!("failed to write progress to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move progress into {}", self.path.display()))?;

        info!(index = last_processed_index, "progress saved");
        Ok(())
    }
}
