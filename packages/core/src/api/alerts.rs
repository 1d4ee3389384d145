//! Alert feed endpoints.
//!
//! Routes:
//! - `GET   /api/alerts`           newest first
//! - `PATCH /api/alerts/:id/read`  mark one alert read
//! - `POST  /api/alerts/read-all`  mark every visible alert read
//!
//! Admins see the whole fleet. Drivers see alerts for the vehicles
//! assigned to them and nothing else.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::auth::Caller;
use crate::api::AppState;
use crate::error::AppError;
use crate::ledger::Alert;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Vehicle ids the caller may see, `None` meaning all of them.
pub(crate) async fn visible_vehicle_ids(
    state: &AppState,
    caller: &Caller,
) -> Result<Option<Vec<String>>, AppError> {
    if caller.is_admin() {
        return Ok(None);
    }
    Ok(Some(
        state.repository.vehicle_ids_for_driver(&caller.name).await?,
    ))
}

/// `GET /api/alerts`
pub async fn list_alerts(
    caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let scope = visible_vehicle_ids(&state, &caller).await?;
    let alerts = state.repository.list_alerts(scope.as_deref()).await?;
    Ok(Json(alerts))
}

/// `PATCH /api/alerts/:id/read`: alerts outside the caller's vehicles
/// are reported as missing.
pub async fn mark_read(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let scope = visible_vehicle_ids(&state, &caller).await?;
    if !state
        .repository
        .mark_alert_read(&id, scope.as_deref())
        .await?
    {
        return Err(AppError::NotFound("Alert not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/alerts/read-all`
pub async fn mark_all_read(
    caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let scope = visible_vehicle_ids(&state, &caller).await?;
    let updated = state
        .repository
        .mark_all_alerts_read(scope.as_deref())
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::api::testing::{body_json, request, seeded_state, ADMIN, JANE, JOHN};
    use crate::api::AppState;
    use crate::ledger::Thresholds;

    /// VH-001 (John) gets a warning, VH-002 (Jane) a critical.
    async fn state_with_alerts() -> AppState {
        let state = seeded_state().await;
        let t = Thresholds::default();
        state
            .ledger
            .submit_reading("VH-001", 4850.0, "John Driver", "", &t)
            .await
            .unwrap();
        state
            .ledger
            .submit_reading("VH-002", 5100.0, "Jane Smith", "", &t)
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn admin_sees_all_alerts() {
        let app = create_router(state_with_alerts().await);
        let resp = app
            .oneshot(request(Method::GET, "/api/alerts", ADMIN, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn driver_sees_only_own_vehicle_alerts() {
        let app = create_router(state_with_alerts().await);
        let resp = app
            .oneshot(request(Method::GET, "/api/alerts", JANE, None))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        let alerts = json.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["vehicleId"], "VH-002");
        assert_eq!(alerts[0]["type"], "critical");
        assert_eq!(
            alerts[0]["title"],
            "CRITICAL: Vehicle VH-002 has exceeded the mileage limit!"
        );
    }

    #[tokio::test]
    async fn driver_without_vehicles_sees_nothing() {
        let app = create_router(state_with_alerts().await);
        let resp = app
            .oneshot(request(
                Method::GET,
                "/api/alerts",
                Some(("Nobody", "driver")),
                None,
            ))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_sets_flag_and_404s_when_missing() {
        let state = state_with_alerts().await;
        let id = state.repository.list_alerts(None).await.unwrap()[0].id.clone();
        let app = create_router(state.clone());

        let resp = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                &format!("/api/alerts/{}/read", id),
                ADMIN,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let alerts = state.repository.list_alerts(None).await.unwrap();
        assert!(alerts.iter().find(|a| a.id == id).unwrap().read);

        let resp = app
            .oneshot(request(Method::PATCH, "/api/alerts/missing/read", ADMIN, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn driver_cannot_mark_another_drivers_alert() {
        let state = state_with_alerts().await;
        let janes = state
            .repository
            .list_alerts(Some(&["VH-002".to_string()]))
            .await
            .unwrap()[0]
            .id
            .clone();
        let app = create_router(state.clone());
        let uri = format!("/api/alerts/{}/read", janes);

        let resp = app
            .clone()
            .oneshot(request(Method::PATCH, &uri, JOHN, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let alerts = state.repository.list_alerts(None).await.unwrap();
        assert!(!alerts.iter().find(|a| a.id == janes).unwrap().read);

        let resp = app
            .oneshot(request(Method::PATCH, &uri, JANE, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn read_all_is_scoped_for_drivers() {
        let state = state_with_alerts().await;
        let app = create_router(state.clone());

        let resp = app
            .clone()
            .oneshot(request(Method::POST, "/api/alerts/read-all", JOHN, None))
            .await
            .unwrap();
        assert_eq!(body_json(resp.into_body()).await["updated"], 1);

        let resp = app
            .oneshot(request(Method::POST, "/api/alerts/read-all", ADMIN, None))
            .await
            .unwrap();
        assert_eq!(body_json(resp.into_body()).await["updated"], 1);

        let alerts = state.repository.list_alerts(None).await.unwrap();
        assert!(alerts.iter().all(|a| a.read));
    }
}
