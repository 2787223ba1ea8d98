//! Append-only JSON Lines log of served requests.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// One served request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: DateTime<Utc>,
    pub video_id: String,
    /// Video duration in seconds.
    pub duration: u64,
    pub output_type: String,
    pub language: String,
    pub file_type: String,
    pub video_url: String,
}

/// Appends [`RequestRecord`]s to a file, one JSON object per line.
pub struct RequestLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. Failures are logged and otherwise ignored.
    pub async fn append(&self, record: &RequestRecord) {
        if let Err(e) = self.try_append(record).await {
            warn!("Failed to write request log {}: {}", self.path.display(), e);
        }
    }

    async fn try_append(&self, record: &RequestRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
