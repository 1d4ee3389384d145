//! Vehicle registry endpoints.
//!
//! Routes:
//! - `GET    /api/vehicles`        all vehicles, ordered by registration
//! - `GET    /api/vehicles/stats`  fleet stats over active vehicles
//! - `GET    /api/vehicles/:id`    one vehicle plus its live `mileageStatus`
//! - `POST   /api/vehicles`        create (admin)
//! - `PUT    /api/vehicles/:id`    edit descriptive fields (admin)
//! - `DELETE /api/vehicles/:id`    delete with its history (admin)
//!
//! Mileage and alert latches are not editable here; they change only
//! through readings and maintenance resets.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::{self, ActivityEntry, FleetStats, MileageStatus, Vehicle, VehicleLifecycle};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub id: Option<String>,
    pub registration: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub driver: Option<String>,
    pub mileage: Option<f64>,
    pub status: Option<VehicleLifecycle>,
    pub fuel_type: Option<String>,
    pub year: Option<i64>,
    pub department: Option<String>,
    pub notes: Option<String>,
    pub registration_date: Option<String>,
    pub registration_expiry: Option<String>,
    pub insurance_date: Option<String>,
    pub insurance_expiry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    pub registration: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub driver: Option<String>,
    pub mileage: Option<f64>,
    pub status: Option<VehicleLifecycle>,
    pub fuel_type: Option<String>,
    pub year: Option<i64>,
    pub department: Option<String>,
    pub notes: Option<String>,
    pub registration_date: Option<String>,
    pub registration_expiry: Option<String>,
    pub insurance_date: Option<String>,
    pub insurance_expiry: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub mileage_status: MileageStatus,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `GET /api/vehicles`
pub async fn list_vehicles(
    _caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    Ok(Json(state.repository.list_vehicles().await?))
}

/// `GET /api/vehicles/stats`
pub async fn fleet_stats(
    _caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<FleetStats>, AppError> {
    let thresholds = state.thresholds().await?;
    let vehicles = state.repository.list_vehicles().await?;
    Ok(Json(ledger::fleet_stats(vehicles.iter(), &thresholds)))
}

/// `GET /api/vehicles/:id`
pub async fn get_vehicle(
    _caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleDetail>, AppError> {
    let vehicle = state
        .repository
        .fetch_vehicle(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;
    let thresholds = state.thresholds().await?;

    Ok(Json(VehicleDetail {
        mileage_status: ledger::status_of(vehicle.mileage, &thresholds),
        vehicle,
    }))
}

/// `POST /api/vehicles`: id defaults to `VH{millis}`.
pub async fn create_vehicle(
    caller: Caller,
    State(state): State<AppState>,
    Json(body): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    caller.require_admin()?;

    let registration = body.registration.trim().to_string();
    let kind = body.kind.trim().to_string();
    if registration.is_empty() || kind.is_empty() {
        return Err(AppError::BadRequest(
            "Registration and type are required".to_string(),
        ));
    }

    let mileage = body.mileage.unwrap_or(0.0);
    if !mileage.is_finite() || mileage < 0.0 {
        return Err(AppError::BadRequest(
            "Mileage must be a non-negative number".to_string(),
        ));
    }

    let id = non_blank(body.id)
        .unwrap_or_else(|| format!("VH{}", Utc::now().timestamp_millis()));
    if state.repository.fetch_vehicle(&id).await?.is_some() {
        return Err(AppError::Conflict(format!("Vehicle {} already exists", id)));
    }

    let mut vehicle = Vehicle::new(id, registration, kind);
    vehicle.driver = non_blank(body.driver);
    vehicle.mileage = mileage;
    vehicle.status = body.status.unwrap_or_default();
    if let Some(fuel_type) = non_blank(body.fuel_type) {
        vehicle.fuel_type = fuel_type;
    }
    vehicle.year = body.year;
    vehicle.department = body.department.unwrap_or_default();
    vehicle.notes = body.notes.unwrap_or_default();
    vehicle.registration_date = non_blank(body.registration_date);
    vehicle.registration_expiry = non_blank(body.registration_expiry);
    vehicle.insurance_date = non_blank(body.insurance_date);
    vehicle.insurance_expiry = non_blank(body.insurance_expiry);

    let activity = ActivityEntry::new(
        "vehicle_added",
        format!("Vehicle {} added", vehicle.registration),
        "fa-plus-circle",
        Some(vehicle.id.clone()),
        vehicle.created_at,
    );
    state.repository.insert_vehicle(&vehicle, &activity).await?;

    tracing::info!(vehicle_id = %vehicle.id, by = %caller.name, "Vehicle created");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// `PUT /api/vehicles/:id`: absent fields keep their value; an empty
/// `driver` unassigns the vehicle and an empty date clears it.
pub async fn update_vehicle(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    caller.require_admin()?;

    if body.mileage.is_some() {
        return Err(AppError::BadRequest(
            "Mileage can only change through readings or a maintenance reset".to_string(),
        ));
    }

    let mut vehicle = state
        .repository
        .fetch_vehicle(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    if let Some(registration) = non_blank(body.registration) {
        vehicle.registration = registration;
    }
    if let Some(kind) = non_blank(body.kind) {
        vehicle.kind = kind;
    }
    if let Some(driver) = body.driver {
        vehicle.driver = non_blank(Some(driver));
    }
    if let Some(status) = body.status {
        vehicle.status = status;
    }
    if let Some(fuel_type) = non_blank(body.fuel_type) {
        vehicle.fuel_type = fuel_type;
    }
    if body.year.is_some() {
        vehicle.year = body.year;
    }
    if let Some(department) = body.department {
        vehicle.department = department;
    }
    if let Some(notes) = body.notes {
        vehicle.notes = notes;
    }
    // Present-but-empty clears a date.
    for (field, value) in [
        (&mut vehicle.registration_date, body.registration_date),
        (&mut vehicle.registration_expiry, body.registration_expiry),
        (&mut vehicle.insurance_date, body.insurance_date),
        (&mut vehicle.insurance_expiry, body.insurance_expiry),
    ] {
        if let Some(value) = value {
            *field = non_blank(Some(value));
        }
    }
    vehicle.updated_at = Utc::now();

    let activity = ActivityEntry::new(
        "vehicle_updated",
        format!("Vehicle {} updated", vehicle.registration),
        "fa-edit",
        Some(vehicle.id.clone()),
        vehicle.updated_at,
    );
    if !state
        .repository
        .update_vehicle_details(&vehicle, &activity)
        .await?
    {
        return Err(AppError::NotFound("Vehicle not found".to_string()));
    }

    let stored = state
        .repository
        .fetch_vehicle(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;
    Ok(Json(stored))
}

/// `DELETE /api/vehicles/:id`
pub async fn delete_vehicle(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    caller.require_admin()?;

    let vehicle = state
        .repository
        .fetch_vehicle(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    let activity = ActivityEntry::new(
        "vehicle_deleted",
        format!("Vehicle {} deleted", vehicle.registration),
        "fa-trash",
        None,
        Utc::now(),
    );
    if !state.repository.delete_vehicle(&id, &activity).await? {
        return Err(AppError::NotFound("Vehicle not found".to_string()));
    }

    tracing::info!(vehicle_id = %id, by = %caller.name, "Vehicle deleted");
    Ok(Json(json!({ "success": true })))
}
