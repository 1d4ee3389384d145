//! Webhook alert delivery.
//!
//! When `ALERT_WEBHOOK_URL` is configured, every alert the ledger emits is
//! POSTed there as JSON in the same shape `GET /api/alerts` returns.
//! Delivery runs on a spawned task so a slow or failing receiver never
//! delays or fails the reading that raised the alert.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::ledger::Alert;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),
}

/// Posts alerts to a single webhook target.
pub struct AlertNotifier {
    webhook_url: String,
    http: Client,
}

impl AlertNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            http,
        })
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// POST one alert and wait for a 2xx.
    pub async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        let resp = self.http.post(&self.webhook_url).json(alert).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Fire-and-forget delivery. Failures are logged only.
    pub fn notify(self: &Arc<Self>, alert: Alert) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            match notifier.deliver(&alert).await {
                Ok(()) => tracing::info!(
                    alert_id = %alert.id,
                    vehicle_id = %alert.vehicle_id,
                    "Alert delivered to webhook"
                ),
                Err(err) => tracing::error!(
                    alert_id = %alert.id,
                    "Failed to deliver alert to {}: {}",
                    notifier.webhook_url,
                    err
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::ledger::AlertSeverity;

    fn make_alert() -> Alert {
        Alert {
            id: "alert-1".to_string(),
            vehicle_id: "VH-002".to_string(),
            severity: AlertSeverity::Warning,
            title: "WARNING: Vehicle VH-002 is approaching mileage limit".to_string(),
            message: "Current mileage: 4850 miles. Only 150 miles remaining.".to_string(),
            timestamp: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn deliver_posts_alert_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "vehicleId": "VH-002",
                "type": "warning",
                "read": false
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = AlertNotifier::new(format!("{}/hook", server.uri())).unwrap();
        notifier.deliver(&make_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn deliver_reports_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = AlertNotifier::new(server.uri()).unwrap();
        let err = notifier.deliver(&make_alert()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(500)));
    }

    #[tokio::test]
    async fn notify_delivers_in_background() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let notifier = Arc::new(AlertNotifier::new(server.uri()).unwrap());
        notifier.notify(make_alert());

        let mut received = 0;
        for _ in 0..50 {
            received = server.received_requests().await.map(|r| r.len()).unwrap_or(0);
            if received > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(received, 1);
    }
}
