//! Calendar API endpoint.

use std::sync::Arc;

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::CalendarData;
use crate::AppState;

/// GET /api/calendar - Day/week/month "who moved" tables, zero-change
/// members excluded.
pub async fn get_calendar(State(state): State<AppState>) -> ApiResult<Arc<CalendarData>> {
    let times = state.aggregator.timeline().await?;
    let aggregator = Arc::clone(&state.aggregator);
    let key = times.clone();

    let data = state
        .caches
        .calendar
        .get_or_compute(key, || async move { aggregator.calendar(&times).await })
        .await?;
    success(data)
}
