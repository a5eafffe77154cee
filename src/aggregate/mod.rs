//! Aggregation engine.
//!
//! Turns the ordered snapshot timeline into derived time-bucketed views:
//! calendar "who moved" lists, hall-of-fame top-10 boards, chart series and
//! point-to-point comparisons. One pass loads each snapshot exactly once;
//! buckets are then derived independently of each other.

mod delta;
mod timeline;

pub use delta::*;
pub use timeline::*;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{
    CalendarBuckets, CalendarData, ChartEntry, ChartPoint, ChartRequest, ComparisonData,
    HallBoard, HallBuckets, HallData, HonorChangeRecord, Snapshot,
};
use crate::store::SnapshotStore;

/// Hall-of-fame board depth.
const TOP_N: usize = 10;

/// Aggregates the snapshot log into the derived views.
pub struct Aggregator {
    store: Arc<dyn SnapshotStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Fetch the timeline, failing fast when the store holds no snapshots.
    pub async fn timeline(&self) -> Result<Vec<i64>, AppError> {
        let times = self.store.timeline().await?;
        if times.is_empty() {
            return Err(AppError::MissingTimelineData);
        }
        Ok(times)
    }

    /// Full calendar view over the whole timeline.
    pub async fn calendar(&self, times: &[i64]) -> Result<CalendarData, AppError> {
        let snapshots = self.load_all(times).await?;
        let data = CalendarData {
            days: Self::calendar_buckets(Granularity::Day, times, &snapshots)?,
            weeks: Self::calendar_buckets(Granularity::Week, times, &snapshots)?,
            months: Self::calendar_buckets(Granularity::Month, times, &snapshots)?,
        };
        tracing::debug!(
            days = data.days.len(),
            weeks = data.weeks.len(),
            months = data.months.len(),
            "Recomputed calendar aggregates"
        );
        Ok(data)
    }

    /// Full hall-of-fame view over the whole timeline.
    pub async fn hall(&self, times: &[i64]) -> Result<HallData, AppError> {
        let snapshots = self.load_all(times).await?;
        let data = HallData {
            days: Self::hall_buckets(Granularity::Day, times, &snapshots)?,
            weeks: Self::hall_buckets(Granularity::Week, times, &snapshots)?,
            months: Self::hall_buckets(Granularity::Month, times, &snapshots)?,
        };
        tracing::debug!(
            days = data.days.len(),
            weeks = data.weeks.len(),
            months = data.months.len(),
            "Recomputed hall-of-fame aggregates"
        );
        Ok(data)
    }

    /// The raw snapshots nearest to two arbitrary timestamps.
    pub async fn compare(
        &self,
        times: &[i64],
        start: i64,
        end: i64,
    ) -> Result<ComparisonData, AppError> {
        let begin = nearest(start, times).ok_or(AppError::MissingTimelineData)?;
        let finish = nearest(end, times).ok_or(AppError::MissingTimelineData)?;
        Ok(ComparisonData {
            start: self.store.load(begin).await?,
            end: self.store.load(finish).await?,
        })
    }

    /// Distinct usernames seen anywhere on the timeline, sorted.
    pub async fn usernames(&self, times: &[i64]) -> Result<Vec<String>, AppError> {
        let mut names = BTreeSet::new();
        for &t in times {
            for member in self.store.load(t).await?.members {
                if !member.username.trim().is_empty() {
                    names.insert(member.username);
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Per-day honor/change series for a chosen set of members.
    pub async fn chart(
        &self,
        times: &[i64],
        request: &ChartRequest,
    ) -> Result<Vec<ChartPoint>, AppError> {
        if request.start > request.end {
            return Err(AppError::Validation(
                "Chart start must not be after end".to_string(),
            ));
        }
        // Clamp to the recorded timeline: outside it every span resolves to
        // the same endpoint snapshot, and unclamped ranges would walk an
        // unbounded number of day spans.
        let (first, last) = Self::bounds(times)?;
        let start = request.start.max(first);
        let end = request.end.min(last);
        if start > end {
            return Err(AppError::Validation(
                "Chart range does not overlap the recorded timeline".to_string(),
            ));
        }
        let mut current = start
            .checked_sub(DAY_MS)
            .ok_or_else(|| AppError::Computation(format!("Timestamp out of range: {}", start)))?;
        let stop = end
            .checked_add(DAY_MS)
            .ok_or_else(|| AppError::Computation(format!("Timestamp out of range: {}", end)))?;
        let snapshots = self.load_all(times).await?;
        let mut points = Vec::new();
        // One lead-in day so the first charted day has a change baseline.
        while current < stop {
            let changes = Self::span_changes(current, current + DAY_MS, times, &snapshots)?;
            let members: BTreeMap<String, ChartEntry> = changes
                .into_iter()
                .filter(|c| request.usernames.contains(&c.username))
                .map(|c| {
                    (
                        c.username,
                        ChartEntry {
                            honor: c.honor,
                            honor_change: c.honor_change,
                        },
                    )
                })
                .collect();
            points.push(ChartPoint {
                name: day_label(current)?,
                members,
            });
            current += DAY_MS;
        }
        Ok(points)
    }

    /// Load every snapshot on the timeline once for one aggregation pass.
    async fn load_all(&self, times: &[i64]) -> Result<HashMap<i64, Snapshot>, AppError> {
        let mut snapshots = HashMap::with_capacity(times.len());
        for &t in times {
            snapshots.insert(t, self.store.load(t).await?);
        }
        Ok(snapshots)
    }

    fn bounds(times: &[i64]) -> Result<(i64, i64), AppError> {
        match (times.first(), times.last()) {
            (Some(&first), Some(&last)) => Ok((first, last)),
            _ => Err(AppError::MissingTimelineData),
        }
    }

    fn resolve<'a>(
        at: i64,
        times: &[i64],
        snapshots: &'a HashMap<i64, Snapshot>,
    ) -> Result<&'a Snapshot, AppError> {
        let t = nearest(at, times).ok_or(AppError::MissingTimelineData)?;
        snapshots.get(&t).ok_or_else(|| {
            AppError::Computation(format!("Snapshot {} missing from aggregation pass", t))
        })
    }

    fn span_changes(
        start: i64,
        end: i64,
        times: &[i64],
        snapshots: &HashMap<i64, Snapshot>,
    ) -> Result<Vec<HonorChangeRecord>, AppError> {
        let before = Self::resolve(start, times, snapshots)?;
        let after = Self::resolve(end, times, snapshots)?;
        Ok(honor_changes_all(before, after))
    }

    fn calendar_buckets(
        granularity: Granularity,
        times: &[i64],
        snapshots: &HashMap<i64, Snapshot>,
    ) -> Result<CalendarBuckets, AppError> {
        let (first, last) = Self::bounds(times)?;
        let mut buckets = BTreeMap::new();
        for (start, end) in bucket_spans(granularity, first, last)? {
            let before = Self::resolve(start, times, snapshots)?;
            let after = Self::resolve(end, times, snapshots)?;
            buckets.insert(start, honor_changes_only(before, after));
        }
        Ok(buckets)
    }

    fn hall_buckets(
        granularity: Granularity,
        times: &[i64],
        snapshots: &HashMap<i64, Snapshot>,
    ) -> Result<HallBuckets, AppError> {
        let (first, last) = Self::bounds(times)?;
        let mut buckets = BTreeMap::new();
        for (start, end) in bucket_spans(granularity, first, last)? {
            let changes = Self::span_changes(start, end, times, snapshots)?;
            buckets.insert(start, hall_board(changes));
        }
        Ok(buckets)
    }
}

/// Trim a bucket's change list down to its two top-10 boards.
fn hall_board(changes: Vec<HonorChangeRecord>) -> HallBoard {
    let mut honor = changes.clone();
    honor.sort_by(|a, b| b.honor.cmp(&a.honor));
    honor.truncate(TOP_N);

    // Already sorted descending by change.
    let mut change = changes;
    change.truncate(TOP_N);

    HallBoard { honor, change }
}

fn day_label(ms: i64) -> Result<String, AppError> {
    let dt = DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Computation(format!("Timestamp out of range: {}", ms)))?;
    Ok(dt.format("%Y-%m-%d").to_string())
}
