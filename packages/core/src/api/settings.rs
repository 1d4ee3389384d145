use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::ActivityEntry;
use crate::repository::Settings;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub max_mileage: Option<f64>,
    pub warning_threshold: Option<f64>,
    pub email_alerts: Option<bool>,
    pub push_alerts: Option<bool>,
    pub driver_see_mileage: Option<bool>,
}

fn validate(settings: &Settings) -> Result<(), AppError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(settings.max_mileage) || !positive(settings.warning_threshold) {
        return Err(AppError::BadRequest(
            "Thresholds must be positive numbers".to_string(),
        ));
    }
    if settings.warning_threshold >= settings.max_mileage {
        return Err(AppError::BadRequest(
            "Warning threshold must be less than max mileage".to_string(),
        ));
    }
    Ok(())
}

/// `GET /api/settings`
pub async fn get_settings(
    _caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.settings().await?))
}

/// `PUT /api/settings`: partial update; new thresholds apply to the next
/// reading, existing latches are left alone.
pub async fn update_settings(
    caller: Caller,
    State(state): State<AppState>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    caller.require_admin()?;

    let mut settings = state.settings().await?;
    if let Some(v) = body.max_mileage {
        settings.max_mileage = v;
    }
    if let Some(v) = body.warning_threshold {
        settings.warning_threshold = v;
    }
    if let Some(v) = body.email_alerts {
        settings.email_alerts = v;
    }
    if let Some(v) = body.push_alerts {
        settings.push_alerts = v;
    }
    if let Some(v) = body.driver_see_mileage {
        settings.driver_see_mileage = v;
    }
    validate(&settings)?;

    state.repository.save_settings(&settings).await?;
    state
        .repository
        .insert_activity(&ActivityEntry::new(
            "settings",
            "Settings updated",
            "fa-cog",
            None,
            Utc::now(),
        ))
        .await?;

    tracing::info!(
        by = %caller.name,
        max_mileage = settings.max_mileage,
        warning_threshold = settings.warning_threshold,
        "Settings updated"
    );
    Ok(Json(settings))
}
