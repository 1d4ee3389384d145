use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Unified application error.
///
/// Every HTTP handler returns `Result<_, AppError>`; the response body is
/// always `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Database(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Ledger(err) => match err {
                LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::InvalidReading { .. } => StatusCode::BAD_REQUEST,
                LedgerError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
                LedgerError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        // Ledger rejections carry a human message; surface only that part.
        let message = match &self {
            AppError::Ledger(LedgerError::InvalidReading { message }) => message.clone(),
            AppError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn ledger_errors_map_to_http_status() {
        let cases = [
            (LedgerError::not_found("VH-1"), StatusCode::NOT_FOUND),
            (LedgerError::invalid_reading("bad"), StatusCode::BAD_REQUEST),
            (
                LedgerError::DuplicateSubmission {
                    vehicle_id: "VH-1".to_string(),
                    mileage: 10.0,
                    window_seconds: 60,
                },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::store_unavailable("down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn invalid_reading_body_is_the_bare_message() {
        let resp = AppError::from(LedgerError::invalid_reading(
            "New mileage (10) must be greater than current (20). Rollback not allowed.",
        ))
        .into_response();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(
            json["error"],
            "New mileage (10) must be greater than current (20). Rollback not allowed."
        );
    }

    #[tokio::test]
    async fn forbidden_has_error_body() {
        let resp = AppError::Forbidden("Admin access required".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(resp).await["error"], "Admin access required");
    }
}
