//! HTTP surface.
//!
//! Everything under `/api` except `/api/health` requires the caller headers
//! checked by [`auth::Caller`]. `/metrics` sits outside `/api`.

pub mod activity;
pub mod alerts;
pub mod auth;
pub mod health;
pub mod maintenance;
pub mod mileage;
pub mod settings;
pub mod vehicles;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::alerts::AlertNotifier;
use crate::error::AppError;
use crate::ledger::{Alert, MileageLedger, Thresholds};
use crate::metrics::{metrics_handler, track_http, AppMetrics};
use crate::repository::{FleetRepository, Settings};

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<FleetRepository>,
    pub ledger: Arc<MileageLedger>,
    pub metrics: Arc<AppMetrics>,
    pub notifier: Option<Arc<AlertNotifier>>,
    /// Returned by `GET /api/settings` until an admin saves something.
    pub default_settings: Settings,
}

impl AppState {
    pub fn new(
        repository: Arc<FleetRepository>,
        metrics: Arc<AppMetrics>,
        notifier: Option<Arc<AlertNotifier>>,
        default_thresholds: Thresholds,
    ) -> Self {
        let ledger = Arc::new(MileageLedger::new(repository.clone()));
        Self {
            repository,
            ledger,
            metrics,
            notifier,
            default_settings: Settings::with_thresholds(default_thresholds),
        }
    }

    pub async fn settings(&self) -> Result<Settings, AppError> {
        Ok(self.repository.load_settings(&self.default_settings).await?)
    }

    pub async fn thresholds(&self) -> Result<Thresholds, AppError> {
        Ok(self.settings().await?.thresholds())
    }

    /// Hand an emitted alert to the webhook notifier, if one is configured.
    pub fn dispatch_alert(&self, alert: &Alert) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(alert.clone());
        }
    }
}

impl FromRef<AppState> for Arc<AppMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Assemble the full application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route(
            "/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route("/vehicles/stats", get(vehicles::fleet_stats))
        .route(
            "/vehicles/:id",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        )
        .route(
            "/mileage",
            get(mileage::list_logs).post(mileage::submit_reading),
        )
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/read-all", post(alerts::mark_all_read))
        .route("/alerts/:id/read", patch(alerts::mark_read))
        .route("/activity", get(activity::list_activity))
        .route(
            "/maintenance",
            get(maintenance::list_maintenance).post(maintenance::create_maintenance),
        )
        .route(
            "/maintenance/:id",
            axum::routing::delete(maintenance::delete_maintenance),
        )
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        );

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_http,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use http_body_util::BodyExt;

    use crate::db::create_pool;
    use crate::ledger::Vehicle;

    pub async fn test_state() -> AppState {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repository = Arc::new(FleetRepository::new(pool));
        let metrics = Arc::new(AppMetrics::new().unwrap());
        AppState::new(repository, metrics, None, Thresholds::default())
    }

    /// State with VH-001 (driven by John Driver) and VH-002 (Jane Smith).
    pub async fn seeded_state() -> AppState {
        let state = test_state().await;
        for (id, reg, driver) in [
            ("VH-001", "ABC 1234", "John Driver"),
            ("VH-002", "DEF 5678", "Jane Smith"),
        ] {
            let mut vehicle = Vehicle::new(id, reg, "Sedan");
            vehicle.driver = Some(driver.to_string());
            let activity = crate::ledger::ActivityEntry::new(
                "vehicle_added",
                format!("Vehicle {} added", reg),
                "fa-plus-circle",
                Some(id.to_string()),
                chrono::Utc::now(),
            );
            state
                .repository
                .insert_vehicle(&vehicle, &activity)
                .await
                .unwrap();
        }
        state
    }

    /// Build a request carrying caller headers. `caller = None` sends none.
    pub fn request(
        method: Method,
        uri: &str,
        caller: Option<(&str, &str)>,
        body: Option<serde_json::Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((name, role)) = caller {
            builder = builder
                .header("x-fleet-user", name)
                .header("x-fleet-role", role);
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub const ADMIN: Option<(&str, &str)> = Some(("Fleet Admin", "admin"));
    pub const JOHN: Option<(&str, &str)> = Some(("John Driver", "driver"));
    pub const JANE: Option<(&str, &str)> = Some(("Jane Smith", "driver"));

    pub async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
