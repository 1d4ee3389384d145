//! Maintenance log endpoints.
//!
//! Recording maintenance with `resetMileage: true` zeroes the vehicle's
//! odometer through
//! [`MileageLedger::reset_with_maintenance`](crate::ledger::MileageLedger::reset_with_maintenance),
//! which also clears both alert latches. The record and the reset commit
//! in one transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::alerts::visible_vehicle_ids;
use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::types::new_record_id;
use crate::ledger::{ActivityEntry, MaintenanceRecord, MaintenanceWrite, ReadingOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    #[serde(default)]
    pub vehicle_id: String,
    #[serde(default)]
    pub artisan_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub repair_work: String,
    #[serde(default)]
    pub maintenance_date: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reset_mileage: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceResponse {
    #[serde(flatten)]
    pub record: MaintenanceRecord,
    /// The ledger reset, when `resetMileage` was requested.
    pub reset: Option<ReadingOutcome>,
}

/// `GET /api/maintenance`: newest first.
pub async fn list_maintenance(
    caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<Vec<MaintenanceRecord>>, AppError> {
    let scope = visible_vehicle_ids(&state, &caller).await?;
    let records = state.repository.list_maintenance(scope.as_deref()).await?;
    Ok(Json(records))
}

/// `POST /api/maintenance`
pub async fn create_maintenance(
    caller: Caller,
    State(state): State<AppState>,
    Json(body): Json<CreateMaintenanceRequest>,
) -> Result<(StatusCode, Json<MaintenanceResponse>), AppError> {
    let required = [
        &body.vehicle_id,
        &body.artisan_name,
        &body.contact_number,
        &body.repair_work,
        &body.maintenance_date,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "Vehicle, artisan name, contact number, repair work, and date are required"
                .to_string(),
        ));
    }
    if !body.cost.is_finite() || body.cost < 0.0 {
        return Err(AppError::BadRequest(
            "Cost must be a non-negative number".to_string(),
        ));
    }

    let vehicle = state
        .repository
        .fetch_vehicle(&body.vehicle_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    let now = Utc::now();
    let record = MaintenanceRecord {
        id: new_record_id(),
        vehicle_id: vehicle.id.clone(),
        artisan_name: body.artisan_name,
        company_name: body.company_name,
        contact_number: body.contact_number,
        repair_work: body.repair_work,
        maintenance_date: body.maintenance_date,
        cost: body.cost,
        notes: body.notes,
        submitted_by: caller.name.clone(),
        reset_mileage: body.reset_mileage,
        created_at: now,
    };
    let activity = ActivityEntry::new(
        "maintenance",
        format!(
            "Maintenance logged for {}: {}",
            vehicle.registration, record.repair_work
        ),
        "fa-wrench",
        Some(vehicle.id.clone()),
        now,
    );

    let reset = if record.reset_mileage {
        let reason = format!("Mileage reset after maintenance: {}", record.repair_work);
        let maintenance = MaintenanceWrite {
            record: record.clone(),
            activity,
        };
        let outcome = state
            .ledger
            .reset_with_maintenance(maintenance, &reason)
            .await?;
        state.metrics.mileage_resets_total.inc();
        Some(outcome)
    } else {
        state
            .repository
            .insert_maintenance(&record, &activity)
            .await?;
        None
    };

    Ok((StatusCode::CREATED, Json(MaintenanceResponse { record, reset })))
}

/// `DELETE /api/maintenance/:id`
pub async fn delete_maintenance(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    caller.require_admin()?;
    if !state.repository.delete_maintenance(&id).await? {
        return Err(AppError::NotFound("Maintenance record not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
