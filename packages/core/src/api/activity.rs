use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::ActivityEntry;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// `GET /api/activity`: newest first, 50 by default.
pub async fn list_activity(
    _caller: Caller,
    State(state): State<AppState>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    let entries = state
        .repository
        .list_activity(params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
        .await?;
    Ok(Json(entries))
}
