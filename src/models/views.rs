//! Derived view payloads served by the API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{HonorChangeRecord, Snapshot};

/// Bucket-start epoch (ms) to full change-sorted member list.
///
/// BTreeMap keeps bucket keys ordered so repeated aggregation of the same
/// timeline serializes byte-identically.
pub type CalendarBuckets = BTreeMap<i64, Vec<HonorChangeRecord>>;

/// Calendar view: per-bucket "who moved" lists, zero-change entries excluded.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarData {
    pub days: CalendarBuckets,
    pub weeks: CalendarBuckets,
    pub months: CalendarBuckets,
}

/// Top-10 tables for one bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HallBoard {
    /// Top members by absolute honor at the bucket's end.
    pub honor: Vec<HonorChangeRecord>,
    /// Top members by honor gained over the bucket.
    pub change: Vec<HonorChangeRecord>,
}

pub type HallBuckets = BTreeMap<i64, HallBoard>;

/// Hall-of-fame view: per-bucket top-10 placements.
#[derive(Debug, Clone, Serialize)]
pub struct HallData {
    pub days: HallBuckets,
    pub weeks: HallBuckets,
    pub months: HallBuckets,
}

/// Point-to-point comparison: the two raw snapshots nearest the requested
/// range, unaggregated (clients compute their own delta).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonData {
    pub start: Snapshot,
    pub end: Snapshot,
}

/// Request body for the chart endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub start: i64,
    pub end: i64,
    pub usernames: Vec<String>,
}

/// Honor/change pair for one member on one chart day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    pub honor: i64,
    pub honor_change: i64,
}

/// One day's chart point: `name` is the day as `YYYY-MM-DD`, the remaining
/// keys are usernames (flattened, matching the original wire shape).
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub name: String,
    #[serde(flatten)]
    pub members: BTreeMap<String, ChartEntry>,
}
