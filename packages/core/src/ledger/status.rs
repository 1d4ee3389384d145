//! Threshold evaluation: live status and alert latching

use crate::ledger::config::Thresholds;
use crate::ledger::types::{AlertSeverity, FleetStats, LatchState, MileageStatus, Vehicle, VehicleLifecycle};

/// Derive the live status of a vehicle at `mileage`. Latches are not consulted.
pub fn status_of(mileage: f64, thresholds: &Thresholds) -> MileageStatus {
    let remaining = thresholds.remaining(mileage);
    if remaining <= 0.0 {
        MileageStatus::Exceeded
    } else if remaining <= thresholds.warning_threshold {
        MileageStatus::Warning
    } else {
        MileageStatus::Normal
    }
}

/// Count active vehicles by status.
pub fn fleet_stats<'a, I>(vehicles: I, thresholds: &Thresholds) -> FleetStats
where
    I: IntoIterator<Item = &'a Vehicle>,
{
    let mut stats = FleetStats::default();
    for vehicle in vehicles
        .into_iter()
        .filter(|v| v.status == VehicleLifecycle::Active)
    {
        stats.total += 1;
        match status_of(vehicle.mileage, thresholds) {
            MileageStatus::Normal => stats.normal += 1,
            MileageStatus::Warning => stats.warning += 1,
            MileageStatus::Exceeded => stats.exceeded += 1,
        }
    }
    stats
}

/// Decide whether accepting `new_mileage` must raise an alert.
///
/// Returns the severity to emit and the latch state to persist. Critical wins
/// over warning, and crossing straight to critical leaves the warning latch
/// as it was.
pub fn evaluate_thresholds(
    new_mileage: f64,
    latches: LatchState,
    thresholds: &Thresholds,
) -> Option<(AlertSeverity, LatchState)> {
    let remaining = thresholds.remaining(new_mileage);

    if remaining <= 0.0 {
        if latches.critical_alert_sent {
            return None;
        }
        return Some((
            AlertSeverity::Critical,
            LatchState {
                critical_alert_sent: true,
                ..latches
            },
        ));
    }

    if remaining <= thresholds.warning_threshold && !latches.warning_alert_sent {
        return Some((
            AlertSeverity::Warning,
            LatchState {
                warning_alert_sent: true,
                ..latches
            },
        ));
    }

    None
}

/// Title and message for an alert of `severity`.
pub fn alert_text(
    severity: AlertSeverity,
    vehicle_id: &str,
    mileage: f64,
    thresholds: &Thresholds,
) -> (String, String) {
    let remaining = thresholds.remaining(mileage);
    match severity {
        AlertSeverity::Critical => (
            format!("CRITICAL: Vehicle {} has exceeded the mileage limit!", vehicle_id),
            format!(
                "Current mileage: {} miles. Limit: {} miles. Exceeded by {} miles.",
                mileage,
                thresholds.max_mileage,
                remaining.abs()
            ),
        ),
        AlertSeverity::Warning => (
            format!("WARNING: Vehicle {} is approaching mileage limit", vehicle_id),
            format!(
                "Current mileage: {} miles. Only {} miles remaining.",
                mileage, remaining
            ),
        ),
    }
}
