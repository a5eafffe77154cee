//! Snapshot data model matching the daily clan export format.

use serde::{Deserialize, Serialize};

/// One member's standing at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub username: String,
    pub honor: i64,
    #[serde(default)]
    pub clan: String,
}

/// One day's complete recorded standings for all members.
///
/// Immutable once written; the timestamp is an epoch-millisecond UTC day
/// boundary and doubles as the snapshot's key in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: i64,
    pub members: Vec<MemberRecord>,
}

/// A member's honor movement between two resolved snapshots.
///
/// Derived, never stored. `honor` is the value at the later snapshot;
/// `honor_change` may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HonorChangeRecord {
    pub username: String,
    pub honor: i64,
    pub honor_change: i64,
}
