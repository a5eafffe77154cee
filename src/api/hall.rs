//! Hall-of-fame API endpoint.

use std::sync::Arc;

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::HallData;
use crate::AppState;

/// GET /api/hall - Top-10 boards per day/week/month bucket, by absolute
/// honor and by honor change.
pub async fn get_hall(State(state): State<AppState>) -> ApiResult<Arc<HallData>> {
    let times = state.aggregator.timeline().await?;
    let aggregator = Arc::clone(&state.aggregator);
    let key = times.clone();

    let data = state
        .caches
        .hall
        .get_or_compute(key, || async move { aggregator.hall(&times).await })
        .await?;
    success(data)
}
