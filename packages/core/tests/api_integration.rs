//! Integration tests for the assembled service.
//!
//! Each test boots the full Axum router (same assembly as `main.rs`) using
//! `tower::ServiceExt::oneshot`, so no live server is needed.
//!
//! `build_test_app()` wires together:
//! - An in-memory SQLite pool with the schema applied and the sample fleet
//!   seeded
//! - Prometheus `AppMetrics`
//! - Optionally an `AlertNotifier` pointed at a wiremock server
//! - The complete `Router` returned ready for `oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use fleet_mileage_tracker::{
    alerts::AlertNotifier,
    api::{create_router, AppState},
    db,
    ledger::Thresholds,
    metrics::AppMetrics,
    repository::FleetRepository,
    seed::seed_sample_fleet,
};

// ---- Helpers ----------------------------------------------------------------

async fn build_test_app(webhook_url: Option<String>) -> Router {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    let repository = Arc::new(FleetRepository::new(pool));
    seed_sample_fleet(&repository, &Thresholds::default())
        .await
        .unwrap();

    let metrics = Arc::new(AppMetrics::new().unwrap());
    let notifier = webhook_url.map(|url| Arc::new(AlertNotifier::new(url).unwrap()));

    create_router(AppState::new(
        repository,
        metrics,
        notifier,
        Thresholds::default(),
    ))
}

fn call(method: Method, uri: &str, role: &str, body: Option<Value>) -> Request<Body> {
    let user = if role == "admin" { "Fleet Admin" } else { "John Driver" };
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-fleet-user", user)
        .header("x-fleet-role", role);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Convenience: collect body bytes and parse as JSON.
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, json_body(resp.into_body()).await)
}

// ---- Public routes ----------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let app = build_test_app(None).await;
    let resp = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp.into_body()).await["status"], "ok");
}

#[tokio::test]
async fn metrics_expose_http_and_ledger_counters() {
    let app = build_test_app(None).await;
    send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-001", "newMileage": 3300 })),
        ),
    )
    .await;

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains("fleet_tracker_readings_accepted_total 1"));
    assert!(body.contains("fleet_tracker_http_requests_total"));
    assert!(body.contains("path=\"/api/mileage\""));
}

// ---- Sample fleet -------------------------------------------------------------

#[tokio::test]
async fn seeded_fleet_stats() {
    let app = build_test_app(None).await;
    let (status, json) = send(&app, call(Method::GET, "/api/vehicles/stats", "driver", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "total": 7, "normal": 4, "warning": 2, "exceeded": 1 }));
}

#[tokio::test]
async fn exceeded_vehicle_reports_status() {
    let app = build_test_app(None).await;
    let (_, json) = send(&app, call(Method::GET, "/api/vehicles/VH-003", "admin", None)).await;

    assert_eq!(json["mileage"], 5100.0);
    assert_eq!(json["mileageStatus"], "exceeded");
    assert_eq!(json["criticalAlertSent"], true);
}

// ---- Full mileage lifecycle ---------------------------------------------------

#[tokio::test]
async fn warning_critical_reset_cycle() {
    let app = build_test_app(None).await;

    // VH-004 sits at 1500.
    let (status, json) = send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-004", "newMileage": 4850 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["alert"]["type"], "warning");

    let (_, json) = send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-004", "newMileage": 4900 })),
        ),
    )
    .await;
    assert!(json["alert"].is_null());

    let (_, json) = send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-004", "newMileage": 5000 })),
        ),
    )
    .await;
    assert_eq!(json["alert"]["type"], "critical");
    assert_eq!(
        json["alert"]["message"],
        "Current mileage: 5000 miles. Limit: 5000 miles. Exceeded by 0 miles."
    );

    let (status, _) = send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-004", "newMileage": 4000 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        call(
            Method::POST,
            "/api/maintenance",
            "admin",
            Some(json!({
                "vehicleId": "VH-004",
                "artisanName": "Kofi Mensah",
                "contactNumber": "0240000000",
                "repairWork": "Full service",
                "maintenanceDate": "2026-10-18",
                "resetMileage": true
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["reset"]["log"]["milesAdded"], -5000.0);

    let (_, vehicle) = send(&app, call(Method::GET, "/api/vehicles/VH-004", "admin", None)).await;
    assert_eq!(vehicle["mileage"], 0.0);
    assert_eq!(vehicle["warningAlertSent"], false);
    assert_eq!(vehicle["criticalAlertSent"], false);
    assert_eq!(vehicle["mileageStatus"], "normal");

    let (_, logs) = send(
        &app,
        call(Method::GET, "/api/mileage?vehicleId=VH-004&limit=3", "admin", None),
    )
    .await;
    assert_eq!(logs[0]["newMileage"], 0.0);
    assert_eq!(logs[0]["notes"], "Mileage reset after maintenance: Full service");

    let (_, activity) = send(&app, call(Method::GET, "/api/activity?limit=5", "admin", None)).await;
    let messages: Vec<_> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["message"].as_str().unwrap().to_string())
        .collect();
    assert!(messages.contains(&"Mileage reset to 0 for JKL 3456 after maintenance".to_string()));
}

#[tokio::test]
async fn driver_sees_own_alerts_only() {
    let app = build_test_app(None).await;
    // John Driver drives VH-001, which has no alerts in the sample fleet.
    let (_, alerts) = send(&app, call(Method::GET, "/api/alerts", "driver", None)).await;
    assert!(alerts.as_array().unwrap().is_empty());

    let (_, alerts) = send(&app, call(Method::GET, "/api/alerts", "admin", None)).await;
    assert_eq!(alerts.as_array().unwrap().len(), 3);
}

// ---- Webhook ----------------------------------------------------------------

#[tokio::test]
async fn emitted_alert_is_posted_to_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fleet-alerts"))
        .and(body_partial_json(json!({ "vehicleId": "VH-001", "type": "warning" })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = build_test_app(Some(format!("{}/fleet-alerts", server.uri()))).await;
    let (status, _) = send(
        &app,
        call(
            Method::POST,
            "/api/mileage",
            "driver",
            Some(json!({ "vehicleId": "VH-001", "newMileage": 4900 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut received = 0;
    for _ in 0..50 {
        received = server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0);
        if received > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(received, 1);
}
