//! Point-to-point comparison API endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::aggregate::DAY_MS;
use crate::errors::AppError;
use crate::models::ComparisonData;
use crate::AppState;

/// Query parameters for the comparison endpoint.
#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub start: i64,
    pub end: i64,
}

/// GET /api/leaderboard?start=&end= - The raw snapshots nearest the two
/// requested timestamps; clients compute their own delta.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> ApiResult<Arc<ComparisonData>> {
    // Bump the end one day so an inclusive date range covers its last snapshot.
    let start = params.start;
    let end = params.end.checked_add(DAY_MS).ok_or_else(|| {
        AppError::Validation(format!("End timestamp out of range: {}", params.end))
    })?;

    let times = state.aggregator.timeline().await?;
    let aggregator = Arc::clone(&state.aggregator);
    let key = (times.clone(), start, end);

    let data = state
        .caches
        .comparison
        .get_or_compute(key, || async move {
            aggregator.compare(&times, start, end).await
        })
        .await?;
    success(data)
}
