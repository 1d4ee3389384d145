//! Odometer reading endpoints.
//!
//! `POST /api/mileage` is the HTTP face of
//! [`MileageLedger::submit_reading`](crate::ledger::MileageLedger::submit_reading).
//! Thresholds come from the persisted settings at the time of the call.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::{MileageLogEntry, ReadingOutcome};

const DEFAULT_LOG_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub vehicle_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReadingRequest {
    pub vehicle_id: String,
    pub new_mileage: f64,
    #[serde(default)]
    pub notes: String,
}

/// `GET /api/mileage`: newest first.
pub async fn list_logs(
    _caller: Caller,
    State(state): State<AppState>,
    Query(params): Query<LogQuery>,
) -> Result<Json<Vec<MileageLogEntry>>, AppError> {
    let logs = state
        .repository
        .list_logs(
            params.vehicle_id.as_deref(),
            params.limit.unwrap_or(DEFAULT_LOG_LIMIT),
        )
        .await?;
    Ok(Json(logs))
}

/// `POST /api/mileage`: 201 with `{log, vehicle, alert}`.
pub async fn submit_reading(
    caller: Caller,
    State(state): State<AppState>,
    Json(body): Json<SubmitReadingRequest>,
) -> Result<(StatusCode, Json<ReadingOutcome>), AppError> {
    let thresholds = state.thresholds().await?;

    let result = state
        .ledger
        .submit_reading(
            &body.vehicle_id,
            body.new_mileage,
            &caller.name,
            &body.notes,
            &thresholds,
        )
        .await;
    state.metrics.record_reading(&result);

    let outcome = result?;
    if let Some(alert) = &outcome.alert {
        state.dispatch_alert(alert);
    }
    Ok((StatusCode::CREATED, Json(outcome)))
}
