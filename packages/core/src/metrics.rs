//! Prometheus metrics registry for the fleet tracker.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the API state and the HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`), outside the `/api` caller-header check.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

use crate::ledger::{LedgerError, ReadingOutcome};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    pub readings_accepted_total: Counter,
    /// Rejected readings, labelled by `LedgerError::reason()`.
    pub readings_rejected_total: CounterVec,
    /// Alerts emitted, labelled by severity.
    pub alerts_emitted_total: CounterVec,
    pub mileage_resets_total: Counter,
    /// HTTP request count, labelled by method, matched route, and status code.
    pub http_requests_total: CounterVec,
    pub http_request_duration: Histogram,
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let readings_accepted_total = Counter::with_opts(Opts::new(
            "fleet_tracker_readings_accepted_total",
            "Odometer readings accepted by the ledger",
        ))?;

        let readings_rejected_total = CounterVec::new(
            Opts::new(
                "fleet_tracker_readings_rejected_total",
                "Odometer readings rejected by the ledger, by reason",
            ),
            &["reason"],
        )?;

        let alerts_emitted_total = CounterVec::new(
            Opts::new(
                "fleet_tracker_alerts_emitted_total",
                "Mileage alerts emitted, by severity",
            ),
            &["severity"],
        )?;

        let mileage_resets_total = Counter::with_opts(Opts::new(
            "fleet_tracker_mileage_resets_total",
            "Mileage resets after maintenance",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "fleet_tracker_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "fleet_tracker_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(readings_accepted_total.clone()))?;
        registry.register(Box::new(readings_rejected_total.clone()))?;
        registry.register(Box::new(alerts_emitted_total.clone()))?;
        registry.register(Box::new(mileage_resets_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            readings_accepted_total,
            readings_rejected_total,
            alerts_emitted_total,
            mileage_resets_total,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Count the result of a `submit_reading` call.
    pub fn record_reading(&self, result: &Result<ReadingOutcome, LedgerError>) {
        match result {
            Ok(outcome) => {
                self.readings_accepted_total.inc();
                if let Some(alert) = &outcome.alert {
                    self.alerts_emitted_total
                        .with_label_values(&[alert.severity.as_str()])
                        .inc();
                }
            }
            Err(err) => self
                .readings_rejected_total
                .with_label_values(&[err.reason()])
                .inc(),
        }
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(metrics): State<Arc<AppMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            Body::from(body),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics error").into_response()
        }
    }
}

/// Middleware recording request count and latency. Routes are labelled by
/// their matched pattern (`/api/vehicles/:id`) so ids do not explode the
/// label set.
pub async fn track_http(
    State(metrics): State<Arc<AppMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(req).await;

    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());
    metrics
        .http_requests_total
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::ledger::{Alert, AlertSeverity, MileageLogEntry, Vehicle};

    fn outcome(alert: Option<AlertSeverity>) -> ReadingOutcome {
        let now = Utc::now();
        ReadingOutcome {
            log: MileageLogEntry {
                id: "log".to_string(),
                vehicle_id: "VH-001".to_string(),
                previous_mileage: 0.0,
                new_mileage: 4850.0,
                miles_added: 4850.0,
                timestamp: now,
                logged_by: "john".to_string(),
                notes: String::new(),
            },
            vehicle: Vehicle::new("VH-001", "ABC 1234", "Sedan"),
            alert: alert.map(|severity| Alert {
                id: "alert".to_string(),
                vehicle_id: "VH-001".to_string(),
                severity,
                title: String::new(),
                message: String::new(),
                timestamp: now,
                read: false,
            }),
        }
    }

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = AppMetrics::new();
        assert!(metrics.is_ok(), "AppMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn record_reading_counts_accepts_alerts_and_rejections() {
        let metrics = AppMetrics::new().unwrap();

        metrics.record_reading(&Ok(outcome(Some(AlertSeverity::Warning))));
        metrics.record_reading(&Ok(outcome(None)));
        metrics.record_reading(&Err(LedgerError::invalid_reading("rollback")));

        assert!((metrics.readings_accepted_total.get() - 2.0).abs() < f64::EPSILON);
        let warnings = metrics
            .alerts_emitted_total
            .with_label_values(&["warning"])
            .get();
        assert!((warnings - 1.0).abs() < f64::EPSILON);
        let rejected = metrics
            .readings_rejected_total
            .with_label_values(&["invalid_reading"])
            .get();
        assert!((rejected - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn render_contains_metric_names() {
        let metrics = AppMetrics::new().unwrap();
        metrics.readings_accepted_total.inc();
        metrics.mileage_resets_total.inc();
        let output = metrics.render().unwrap();
        assert!(output.contains("fleet_tracker_readings_accepted_total 1"));
        assert!(output.contains("fleet_tracker_mileage_resets_total 1"));
    }
}
