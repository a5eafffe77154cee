//! Snapshot store module.
//!
//! The store is an append-only log of daily snapshots keyed by timestamp.
//! The aggregation core only sees this trait and must not assume any
//! particular storage technology.

mod directory;

pub use directory::*;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::Snapshot;

/// Interface to the ordered, append-only snapshot log.
///
/// Keys are epoch-millisecond UTC day boundaries, one snapshot per day.
/// Timestamps are unique within the store.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// All known snapshot timestamps, sorted ascending.
    ///
    /// The returned sequence is the timeline identity: derived aggregates
    /// are cached against its exact content.
    async fn timeline(&self) -> Result<Vec<i64>, AppError>;

    /// Load the snapshot recorded at `timestamp`.
    async fn load(&self, timestamp: i64) -> Result<Snapshot, AppError>;
}
