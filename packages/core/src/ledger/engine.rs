//! Mileage ledger - accepts odometer readings and raises threshold alerts

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ledger::{
    config::{duplicate_window, Thresholds, DUPLICATE_WINDOW_SECONDS},
    error::LedgerError,
    status::{alert_text, evaluate_thresholds},
    types::*,
};
use crate::store::FleetStore;

/// Owns the rules for changing a vehicle's mileage.
///
/// Each operation reads the vehicle, decides, and commits while holding a
/// per-vehicle lock, so two readings for the same vehicle never interleave.
/// Readings for different vehicles proceed independently.
pub struct MileageLedger {
    store: Arc<dyn FleetStore>,
    vehicle_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MileageLedger {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            store,
            vehicle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn FleetStore> {
        &self.store
    }

    async fn lock_vehicle(&self, vehicle_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.vehicle_locks.lock().await;
            locks.entry(vehicle_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the map entry for `vehicle_id` once no task holds or awaits it.
    ///
    /// Must be called after the caller's guard is dropped. Waiters keep a
    /// clone of the `Arc`, so a count of one means the map owns the only
    /// reference.
    async fn release_vehicle(&self, vehicle_id: &str) {
        let mut locks = self.vehicle_locks.lock().await;
        if locks
            .get(vehicle_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(vehicle_id);
        }
    }

    /// Accept a new odometer reading for `vehicle_id`.
    pub async fn submit_reading(
        &self,
        vehicle_id: &str,
        new_mileage: f64,
        submitter: &str,
        note: &str,
        thresholds: &Thresholds,
    ) -> Result<ReadingOutcome, LedgerError> {
        self.submit_reading_at(vehicle_id, new_mileage, submitter, note, thresholds, Utc::now())
            .await
    }

    /// [`submit_reading`](Self::submit_reading) with an explicit clock.
    pub async fn submit_reading_at(
        &self,
        vehicle_id: &str,
        new_mileage: f64,
        submitter: &str,
        note: &str,
        thresholds: &Thresholds,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, LedgerError> {
        let guard = self.lock_vehicle(vehicle_id).await;
        let outcome = self
            .apply_reading(vehicle_id, new_mileage, submitter, note, thresholds, now)
            .await;
        drop(guard);
        self.release_vehicle(vehicle_id).await;
        outcome
    }

    async fn apply_reading(
        &self,
        vehicle_id: &str,
        new_mileage: f64,
        submitter: &str,
        note: &str,
        thresholds: &Thresholds,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, LedgerError> {
        let vehicle = self
            .store
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(vehicle_id))?;

        if !new_mileage.is_finite() || new_mileage < 0.0 {
            tracing::warn!(vehicle_id, new_mileage, "Rejected malformed mileage reading");
            return Err(LedgerError::invalid_reading(format!(
                "Mileage must be a non-negative number, got {}",
                new_mileage
            )));
        }

        let window = duplicate_window();
        let recent = self
            .store
            .list_recent_logs(vehicle_id, now - window)
            .await?;
        let duplicate = recent.iter().any(|log| {
            log.new_mileage == new_mileage && now.signed_duration_since(log.timestamp) < window
        });
        if duplicate {
            tracing::warn!(vehicle_id, new_mileage, "Rejected duplicate mileage submission");
            return Err(LedgerError::DuplicateSubmission {
                vehicle_id: vehicle_id.to_string(),
                mileage: new_mileage,
                window_seconds: DUPLICATE_WINDOW_SECONDS,
            });
        }

        let previous_mileage = vehicle.mileage;
        if new_mileage <= previous_mileage {
            tracing::warn!(
                vehicle_id,
                new_mileage,
                previous_mileage,
                "Rejected non-increasing mileage reading"
            );
            return Err(LedgerError::invalid_reading(format!(
                "New mileage ({}) must be greater than current ({}). Rollback not allowed.",
                new_mileage, previous_mileage
            )));
        }

        let delta = new_mileage - previous_mileage;
        let log = MileageLogEntry {
            id: new_record_id(),
            vehicle_id: vehicle_id.to_string(),
            previous_mileage,
            new_mileage,
            miles_added: delta,
            timestamp: now,
            logged_by: submitter.to_string(),
            notes: note.to_string(),
        };

        let mut latches = LatchState::of(&vehicle);
        let alert = match evaluate_thresholds(new_mileage, latches, thresholds) {
            Some((severity, next)) => {
                latches = next;
                let (title, message) = alert_text(severity, vehicle_id, new_mileage, thresholds);
                Some(Alert {
                    id: new_record_id(),
                    vehicle_id: vehicle_id.to_string(),
                    severity,
                    title,
                    message,
                    timestamp: now,
                    read: false,
                })
            }
            None => None,
        };

        let activity = ActivityEntry::new(
            "mileage",
            format!(
                "Mileage updated for {}: {} to {} miles (+{})",
                vehicle_id, previous_mileage, new_mileage, delta
            ),
            "fa-road",
            Some(vehicle_id.to_string()),
            now,
        );

        let updated = self
            .store
            .commit(LedgerWrite {
                vehicle_id: vehicle_id.to_string(),
                mileage: new_mileage,
                latches,
                log: log.clone(),
                alert: alert.clone(),
                activity,
                maintenance: None,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                tracing::error!(vehicle_id, "Failed to commit mileage reading: {}", err);
                err
            })?;

        tracing::info!(
            vehicle_id,
            previous_mileage,
            new_mileage,
            "Mileage reading accepted"
        );
        if let Some(alert) = &alert {
            tracing::info!(
                vehicle_id,
                severity = alert.severity.as_str(),
                "Mileage alert emitted"
            );
        }

        Ok(ReadingOutcome {
            log,
            vehicle: updated,
            alert,
        })
    }

    /// Zero the vehicle's mileage after maintenance and clear both latches.
    ///
    /// The only operation allowed to decrease mileage. No threshold
    /// evaluation runs.
    pub async fn reset_on_maintenance(
        &self,
        vehicle_id: &str,
        submitter: &str,
        reason: &str,
    ) -> Result<ReadingOutcome, LedgerError> {
        self.reset_on_maintenance_at(vehicle_id, submitter, reason, Utc::now())
            .await
    }

    /// [`reset_on_maintenance`](Self::reset_on_maintenance) with an explicit clock.
    pub async fn reset_on_maintenance_at(
        &self,
        vehicle_id: &str,
        submitter: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, LedgerError> {
        self.locked_reset(vehicle_id, submitter, reason, None, now)
            .await
    }

    /// Record `maintenance` and reset the vehicle it names in one commit.
    ///
    /// Either the record, its activity entry, and the reset all persist, or
    /// none of them do.
    pub async fn reset_with_maintenance(
        &self,
        maintenance: MaintenanceWrite,
        reason: &str,
    ) -> Result<ReadingOutcome, LedgerError> {
        let vehicle_id = maintenance.record.vehicle_id.clone();
        let submitter = maintenance.record.submitted_by.clone();
        self.locked_reset(&vehicle_id, &submitter, reason, Some(maintenance), Utc::now())
            .await
    }

    async fn locked_reset(
        &self,
        vehicle_id: &str,
        submitter: &str,
        reason: &str,
        maintenance: Option<MaintenanceWrite>,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, LedgerError> {
        let guard = self.lock_vehicle(vehicle_id).await;
        let outcome = self
            .apply_reset(vehicle_id, submitter, reason, maintenance, now)
            .await;
        drop(guard);
        self.release_vehicle(vehicle_id).await;
        outcome
    }

    async fn apply_reset(
        &self,
        vehicle_id: &str,
        submitter: &str,
        reason: &str,
        maintenance: Option<MaintenanceWrite>,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, LedgerError> {
        let vehicle = self
            .store
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(vehicle_id))?;

        let previous_mileage = vehicle.mileage;
        let log = MileageLogEntry {
            id: new_record_id(),
            vehicle_id: vehicle_id.to_string(),
            previous_mileage,
            new_mileage: 0.0,
            miles_added: -previous_mileage,
            timestamp: now,
            logged_by: submitter.to_string(),
            notes: reason.to_string(),
        };

        let activity = ActivityEntry::new(
            "mileage_reset",
            format!(
                "Mileage reset to 0 for {} after maintenance",
                vehicle.registration
            ),
            "fa-undo",
            Some(vehicle_id.to_string()),
            now,
        );

        let updated = self
            .store
            .commit(LedgerWrite {
                vehicle_id: vehicle_id.to_string(),
                mileage: 0.0,
                latches: LatchState::cleared(),
                log: log.clone(),
                alert: None,
                activity,
                maintenance,
                updated_at: now,
            })
            .await?;

        tracing::info!(vehicle_id, previous_mileage, "Mileage reset after maintenance");

        Ok(ReadingOutcome {
            log,
            vehicle: updated,
            alert: None,
        })
    }
}
