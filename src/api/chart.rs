//! Chart series API endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::{success, ApiResult};
use crate::models::{ChartPoint, ChartRequest};
use crate::AppState;

/// POST /api/chart - Per-day honor/change series for the requested members.
pub async fn post_chart(
    State(state): State<AppState>,
    Json(mut request): Json<ChartRequest>,
) -> ApiResult<Arc<Vec<ChartPoint>>> {
    // Sorted usernames keep the cache key stable across callers.
    request.usernames.sort();

    let times = state.aggregator.timeline().await?;
    let aggregator = Arc::clone(&state.aggregator);
    let key = (
        times.clone(),
        request.start,
        request.end,
        request.usernames.clone(),
    );

    let data = state
        .caches
        .chart
        .get_or_compute(key, || async move { aggregator.chart(&times, &request).await })
        .await?;
    success(data)
}
