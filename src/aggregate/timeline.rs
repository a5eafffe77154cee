//! Timeline arithmetic: nearest-timestamp resolution and bucket boundaries.
//!
//! All boundary math is UTC. Buckets are half-open `[start, end)` intervals;
//! weeks start on Sunday and months on the 1st regardless of where the
//! timeline begins.

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};

use crate::errors::AppError;

/// Milliseconds in one UTC day.
pub const DAY_MS: i64 = 86_400_000;

/// Bucket granularity for calendar and hall-of-fame views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

/// Resolve the candidate closest to `target`.
///
/// Ties go to the first-encountered candidate; downstream views depend on
/// that ordering. Returns `None` only for an empty candidate list.
pub fn nearest(target: i64, candidates: &[i64]) -> Option<i64> {
    let mut best: Option<i64> = None;
    for &candidate in candidates {
        // abs_diff keeps extreme targets from overflowing the distance.
        let closer = match best {
            None => true,
            Some(current) => candidate.abs_diff(target) < current.abs_diff(target),
        };
        if closer {
            best = Some(candidate);
        }
    }
    best
}

fn utc(ms: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Computation(format!("Timestamp out of range: {}", ms)))
}

fn day_start_ms(dt: DateTime<Utc>) -> i64 {
    dt.date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

/// The start of the first bucket covering `first`.
fn anchor(granularity: Granularity, first: i64) -> Result<i64, AppError> {
    let dt = utc(first)?;
    let day = day_start_ms(dt);
    match granularity {
        Granularity::Day => Ok(day),
        Granularity::Week => {
            let back = i64::from(dt.weekday().num_days_from_sunday());
            Ok(day - back * DAY_MS)
        }
        Granularity::Month => {
            let month_start = dt.date_naive().with_day(1).ok_or_else(|| {
                AppError::Computation(format!("No month start for timestamp {}", first))
            })?;
            Ok(month_start.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
        }
    }
}

/// The start of the calendar month after the month containing `start`.
fn next_month(start: i64) -> Result<i64, AppError> {
    let date = utc(start)?.date_naive();
    let next = date
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::Computation(format!("Month overflow after {}", start)))?;
    Ok(next.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}

/// Enumerate the half-open bucket spans covering `[first, last)`.
///
/// The walk starts at the granularity's anchor and stops once a bucket would
/// begin at or after `last`, so the final span may extend past `last`; the
/// nearest-snapshot resolution clamps that open end to real data.
pub fn bucket_spans(
    granularity: Granularity,
    first: i64,
    last: i64,
) -> Result<Vec<(i64, i64)>, AppError> {
    let mut spans = Vec::new();
    let mut start = anchor(granularity, first)?;
    while start < last {
        let end = match granularity {
            Granularity::Day => start + DAY_MS,
            Granularity::Week => start + 7 * DAY_MS,
            Granularity::Month => next_month(start)?,
        };
        spans.push((start, end));
        start = end;
    }
    Ok(spans)
}
