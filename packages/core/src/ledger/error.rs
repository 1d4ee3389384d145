//! Error types for mileage ledger operations

use thiserror::Error;

/// Errors returned by [`MileageLedger`](crate::ledger::MileageLedger) operations.
///
/// Every variant leaves vehicle, log, and alert state unchanged.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Vehicle not found: {vehicle_id}")]
    NotFound { vehicle_id: String },

    #[error("Invalid reading: {message}")]
    InvalidReading { message: String },

    #[error("Duplicate submission: mileage {mileage} was already logged for {vehicle_id} within the last {window_seconds} seconds")]
    DuplicateSubmission {
        vehicle_id: String,
        mileage: f64,
        window_seconds: i64,
    },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl LedgerError {
    pub fn not_found(vehicle_id: impl Into<String>) -> Self {
        Self::NotFound { vehicle_id: vehicle_id.into() }
    }

    pub fn invalid_reading(message: impl Into<String>) -> Self {
        Self::InvalidReading { message: message.into() }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::InvalidReading { .. } => "invalid_reading",
            LedgerError::DuplicateSubmission { .. } => "duplicate_submission",
            LedgerError::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::store_unavailable(err.to_string())
    }
}
