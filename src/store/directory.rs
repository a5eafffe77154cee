//! Filesystem-backed snapshot store.
//!
//! One JSON file per day named `<epoch-ms>.json`, each holding the full
//! member list recorded at that instant.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{MemberRecord, Snapshot};

use super::SnapshotStore;

/// Snapshot store reading `<epoch-ms>.json` files from a single directory.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn snapshot_path(&self, timestamp: i64) -> PathBuf {
        self.dir.join(format!("{}.json", timestamp))
    }
}

#[async_trait]
impl SnapshotStore for DirectoryStore {
    async fn timeline(&self) -> Result<Vec<i64>, AppError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut times = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            match stem.parse::<i64>() {
                Ok(timestamp) => times.push(timestamp),
                Err(_) => {
                    tracing::warn!("Ignoring non-snapshot file in store: {}", name);
                }
            }
        }
        times.sort_unstable();
        Ok(times)
    }

    async fn load(&self, timestamp: i64) -> Result<Snapshot, AppError> {
        let path = self.snapshot_path(timestamp);
        let raw = tokio::fs::read(&path).await?;

        // Snapshot files come from an external scraper; individual records
        // may be missing fields. Skip those rather than failing the file.
        let entries: Vec<serde_json::Value> = serde_json::from_slice(&raw)?;
        let mut members = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<MemberRecord>(entry) {
                Ok(member) if member.username.trim().is_empty() => {
                    tracing::warn!(timestamp, "Skipping record with blank username");
                }
                Ok(member) => members.push(member),
                Err(err) => {
                    tracing::warn!(timestamp, "Skipping malformed member record: {}", err);
                }
            }
        }

        Ok(Snapshot { timestamp, members })
    }
}
