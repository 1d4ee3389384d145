//! Core data types for the mileage ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a vehicle in the fleet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VehicleLifecycle {
    #[default]
    Active,
    Inactive,
}

impl VehicleLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleLifecycle::Active => "active",
            VehicleLifecycle::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(VehicleLifecycle::Active),
            "inactive" => Some(VehicleLifecycle::Inactive),
            _ => None,
        }
    }
}

/// A fleet vehicle together with its alert latches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub registration: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub driver: Option<String>,
    pub mileage: f64,
    pub status: VehicleLifecycle,
    pub fuel_type: String,
    pub year: Option<i64>,
    pub department: String,
    pub notes: String,
    /// Document dates as entered (`YYYY-MM-DD` by convention).
    pub registration_date: Option<String>,
    pub registration_expiry: Option<String>,
    pub insurance_date: Option<String>,
    pub insurance_expiry: Option<String>,
    pub warning_alert_sent: bool,
    pub critical_alert_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// A fresh active vehicle with zeroed latches.
    pub fn new(id: impl Into<String>, registration: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            registration: registration.into(),
            kind: kind.into(),
            driver: None,
            mileage: 0.0,
            status: VehicleLifecycle::Active,
            fuel_type: "Diesel".to_string(),
            year: None,
            department: String::new(),
            notes: String::new(),
            registration_date: None,
            registration_expiry: None,
            insurance_date: None,
            insurance_expiry: None,
            warning_alert_sent: false,
            critical_alert_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One accepted odometer reading (or a maintenance reset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MileageLogEntry {
    pub id: String,
    pub vehicle_id: String,
    pub previous_mileage: f64,
    pub new_mileage: f64,
    /// `new_mileage - previous_mileage`; negative only for reset entries.
    pub miles_added: f64,
    pub timestamp: DateTime<Utc>,
    pub logged_by: String,
    pub notes: String,
}

/// Alert severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "warning" => Some(AlertSeverity::Warning),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// A threshold-crossing alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// An entry in the fleet activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub icon: String,
    pub vehicle_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        kind: &str,
        message: impl Into<String>,
        icon: &str,
        vehicle_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(),
            kind: kind.to_string(),
            message: message.into(),
            icon: icon.to_string(),
            vehicle_id,
            timestamp,
        }
    }
}

/// Live mileage status derived from thresholds only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MileageStatus {
    Normal,
    Warning,
    Exceeded,
}

/// Aggregate counts over active vehicles
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FleetStats {
    pub total: usize,
    pub normal: usize,
    pub warning: usize,
    pub exceeded: usize,
}

/// Latch flags written back to the vehicle row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchState {
    pub warning_alert_sent: bool,
    pub critical_alert_sent: bool,
}

impl LatchState {
    pub fn cleared() -> Self {
        Self {
            warning_alert_sent: false,
            critical_alert_sent: false,
        }
    }

    pub fn of(vehicle: &Vehicle) -> Self {
        Self {
            warning_alert_sent: vehicle.warning_alert_sent,
            critical_alert_sent: vehicle.critical_alert_sent,
        }
    }
}

/// A maintenance visit recorded against a vehicle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: String,
    pub vehicle_id: String,
    pub artisan_name: String,
    pub company_name: String,
    pub contact_number: String,
    pub repair_work: String,
    pub maintenance_date: String,
    pub cost: f64,
    pub notes: String,
    pub submitted_by: String,
    pub reset_mileage: bool,
    pub created_at: DateTime<Utc>,
}

/// A maintenance record and its activity entry, committed with a reset
#[derive(Debug, Clone)]
pub struct MaintenanceWrite {
    pub record: MaintenanceRecord,
    pub activity: ActivityEntry,
}

/// Everything one ledger operation persists, applied all-or-nothing
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    pub vehicle_id: String,
    pub mileage: f64,
    pub latches: LatchState,
    pub log: MileageLogEntry,
    pub alert: Option<Alert>,
    pub activity: ActivityEntry,
    /// Present only for a reset triggered by recording maintenance.
    pub maintenance: Option<MaintenanceWrite>,
    pub updated_at: DateTime<Utc>,
}

/// Result of an accepted reading
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReadingOutcome {
    pub log: MileageLogEntry,
    pub vehicle: Vehicle,
    pub alert: Option<Alert>,
}

pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
