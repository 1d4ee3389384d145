//! Sample fleet for demos and local development (`--seed`).
//!
//! Vehicles are inserted at zero and then driven up to their sample
//! mileage through [`FleetStore::commit`], so the seeded logs, alerts,
//! and latches are consistent with what the ledger would have produced.

use chrono::{Duration, Utc};

use crate::ledger::{
    alert_text, ActivityEntry, Alert, AlertSeverity, LatchState, LedgerError, LedgerWrite,
    MileageLogEntry, Thresholds, Vehicle, VehicleLifecycle,
};
use crate::ledger::types::new_record_id;
use crate::repository::FleetRepository;
use crate::store::FleetStore;

struct SampleVehicle {
    id: &'static str,
    registration: &'static str,
    kind: &'static str,
    driver: &'static str,
    mileage: f64,
    active: bool,
    warning_alert_sent: bool,
    critical_alert_sent: bool,
}

const SAMPLE_FLEET: &[SampleVehicle] = &[
    SampleVehicle { id: "VH-001", registration: "ABC 1234", kind: "Sedan", driver: "John Driver", mileage: 3200.0, active: true, warning_alert_sent: false, critical_alert_sent: false },
    SampleVehicle { id: "VH-002", registration: "DEF 5678", kind: "SUV", driver: "Jane Smith", mileage: 4850.0, active: true, warning_alert_sent: true, critical_alert_sent: false },
    SampleVehicle { id: "VH-003", registration: "GHI 9012", kind: "Truck", driver: "Bob Wilson", mileage: 5100.0, active: true, warning_alert_sent: true, critical_alert_sent: true },
    SampleVehicle { id: "VH-004", registration: "JKL 3456", kind: "Van", driver: "Alice Brown", mileage: 1500.0, active: true, warning_alert_sent: false, critical_alert_sent: false },
    SampleVehicle { id: "VH-005", registration: "MNO 7890", kind: "Sedan", driver: "Charlie Davis", mileage: 4200.0, active: true, warning_alert_sent: false, critical_alert_sent: false },
    SampleVehicle { id: "VH-006", registration: "PQR 2345", kind: "Bus", driver: "Diana Evans", mileage: 2800.0, active: true, warning_alert_sent: false, critical_alert_sent: false },
    SampleVehicle { id: "VH-007", registration: "STU 6789", kind: "Motorcycle", driver: "Edward Fox", mileage: 4950.0, active: true, warning_alert_sent: true, critical_alert_sent: false },
    SampleVehicle { id: "VH-008", registration: "VWX 0123", kind: "SUV", driver: "", mileage: 0.0, active: false, warning_alert_sent: false, critical_alert_sent: false },
];

const SEED_STEPS: i64 = 4;
const SEED_STEP_DAYS: i64 = 3;

/// Insert the sample fleet if the vehicles table is empty.
/// Returns the number of vehicles inserted.
pub async fn seed_sample_fleet(
    repository: &FleetRepository,
    thresholds: &Thresholds,
) -> Result<usize, LedgerError> {
    if repository.count_vehicles().await? > 0 {
        tracing::info!("Vehicles already present, skipping sample data");
        return Ok(0);
    }

    let now = Utc::now();
    let first_reading = now - Duration::days(SEED_STEPS * SEED_STEP_DAYS);

    for sample in SAMPLE_FLEET {
        let mut vehicle = Vehicle::new(sample.id, sample.registration, sample.kind);
        vehicle.driver = (!sample.driver.is_empty()).then(|| sample.driver.to_string());
        vehicle.status = if sample.active {
            VehicleLifecycle::Active
        } else {
            VehicleLifecycle::Inactive
        };
        vehicle.created_at = first_reading - Duration::days(1);
        vehicle.updated_at = vehicle.created_at;

        let added = ActivityEntry::new(
            "vehicle_added",
            format!("Vehicle {} added", sample.registration),
            "fa-plus-circle",
            Some(sample.id.to_string()),
            vehicle.created_at,
        );
        repository.insert_vehicle(&vehicle, &added).await?;

        if sample.mileage > 0.0 {
            drive_to_sample_mileage(repository, sample, thresholds, first_reading).await?;
        }
    }

    repository
        .insert_activity(&ActivityEntry::new(
            "system",
            "Sample data loaded successfully",
            "fa-database",
            None,
            now,
        ))
        .await?;

    tracing::info!("Seeded {} sample vehicles", SAMPLE_FLEET.len());
    Ok(SAMPLE_FLEET.len())
}

async fn drive_to_sample_mileage(
    repository: &FleetRepository,
    sample: &SampleVehicle,
    thresholds: &Thresholds,
    first_reading: chrono::DateTime<Utc>,
) -> Result<(), LedgerError> {
    let logged_by = if sample.driver.is_empty() {
        "Admin"
    } else {
        sample.driver
    };

    let mut previous = 0.0;
    for step in 0..SEED_STEPS {
        let at = first_reading + Duration::days(step * SEED_STEP_DAYS);
        let last = step == SEED_STEPS - 1;
        let mileage = if last {
            sample.mileage
        } else {
            (sample.mileage * (step + 1) as f64 / SEED_STEPS as f64).round()
        };

        let (latches, alert) = if last {
            let latches = LatchState {
                warning_alert_sent: sample.warning_alert_sent,
                critical_alert_sent: sample.critical_alert_sent,
            };
            let severity = if sample.critical_alert_sent {
                Some(AlertSeverity::Critical)
            } else if sample.warning_alert_sent {
                Some(AlertSeverity::Warning)
            } else {
                None
            };
            let alert = severity.map(|severity| {
                let (title, message) = alert_text(severity, sample.id, mileage, thresholds);
                Alert {
                    id: new_record_id(),
                    vehicle_id: sample.id.to_string(),
                    severity,
                    title,
                    message,
                    timestamp: at,
                    read: false,
                }
            });
            (latches, alert)
        } else {
            (LatchState::cleared(), None)
        };

        let delta = mileage - previous;
        repository
            .commit(LedgerWrite {
                vehicle_id: sample.id.to_string(),
                mileage,
                latches,
                log: MileageLogEntry {
                    id: new_record_id(),
                    vehicle_id: sample.id.to_string(),
                    previous_mileage: previous,
                    new_mileage: mileage,
                    miles_added: delta,
                    timestamp: at,
                    logged_by: logged_by.to_string(),
                    notes: String::new(),
                },
                alert,
                activity: ActivityEntry::new(
                    "mileage",
                    format!(
                        "Mileage updated for {}: {} to {} miles (+{})",
                        sample.id, previous, mileage, delta
                    ),
                    "fa-road",
                    Some(sample.id.to_string()),
                    at,
                ),
                maintenance: None,
                updated_at: at,
            })
            .await?;
        previous = mileage;
    }
    Ok(())
}
