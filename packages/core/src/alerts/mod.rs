//! Outbound delivery of mileage alerts.

pub mod webhook;

pub use webhook::{AlertNotifier, NotifyError};
