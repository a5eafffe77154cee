//! Member list API endpoint.

use std::sync::Arc;

use axum::extract::State;

use super::{success, ApiResult};
use crate::AppState;

/// GET /api/userlist - Every username seen anywhere on the timeline.
pub async fn get_userlist(State(state): State<AppState>) -> ApiResult<Arc<Vec<String>>> {
    let times = state.aggregator.timeline().await?;
    let aggregator = Arc::clone(&state.aggregator);
    let key = times.clone();

    let data = state
        .caches
        .userlist
        .get_or_compute(key, || async move { aggregator.usernames(&times).await })
        .await?;
    success(data)
}
