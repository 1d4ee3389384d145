//! Storage contract consumed by the mileage ledger.
//!
//! [`FleetStore`] is the narrow seam between the ledger and persistence:
//! two reads and one all-or-nothing commit. [`FleetRepository`] is the
//! SQLite implementation; [`MemoryStore`] keeps everything in process and
//! backs the ledger tests.
//!
//! The memory store is internally synchronised, so it can be shared as
//! `Arc<MemoryStore>` between tasks without an outer lock.
//!
//! [`FleetRepository`]: crate::repository::FleetRepository

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    ActivityEntry, Alert, LedgerWrite, MaintenanceRecord, MileageLogEntry, Vehicle,
};

/// Default number of activity entries retained in memory.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 100;

/// Persistence operations the ledger relies on.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Look up a vehicle by id.
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>, LedgerError>;

    /// Log entries for `vehicle_id` recorded at or after `since`, newest first.
    async fn list_recent_logs(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MileageLogEntry>, LedgerError>;

    /// Apply a ledger write set atomically and return the updated vehicle.
    async fn commit(&self, write: LedgerWrite) -> Result<Vehicle, LedgerError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    vehicles: HashMap<String, Vehicle>,
    logs: Vec<MileageLogEntry>,
    alerts: Vec<Alert>,
    maintenance: Vec<MaintenanceRecord>,
    activity: VecDeque<ActivityEntry>,
}

/// In-process [`FleetStore`].
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    activity_capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl MemoryStore {
    /// Create an empty store keeping at most `activity_capacity` activity entries.
    pub fn new(activity_capacity: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            activity_capacity,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::store_unavailable("memory store lock poisoned"))
    }

    /// Insert or replace a vehicle.
    pub fn put_vehicle(&self, vehicle: Vehicle) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.vehicles.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    /// All log entries for `vehicle_id`, newest first.
    pub fn logs_for(&self, vehicle_id: &str) -> Result<Vec<MileageLogEntry>, LedgerError> {
        let state = self.lock()?;
        let mut logs: Vec<_> = state
            .logs
            .iter()
            .filter(|l| l.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    /// All alerts, newest first.
    pub fn alerts(&self) -> Result<Vec<Alert>, LedgerError> {
        let state = self.lock()?;
        Ok(state.alerts.iter().rev().cloned().collect())
    }

    /// Maintenance records committed alongside resets, newest first.
    pub fn maintenance(&self) -> Result<Vec<MaintenanceRecord>, LedgerError> {
        let state = self.lock()?;
        Ok(state.maintenance.iter().rev().cloned().collect())
    }

    fn push_activity(&self, state: &mut MemoryState, entry: ActivityEntry) {
        if state.activity.len() >= self.activity_capacity {
            state.activity.pop_front();
        }
        state.activity.push_back(entry);
    }

    /// Retained activity entries, newest first.
    pub fn activity(&self) -> Result<Vec<ActivityEntry>, LedgerError> {
        let state = self.lock()?;
        Ok(state.activity.iter().rev().cloned().collect())
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>, LedgerError> {
        let state = self.lock()?;
        Ok(state.vehicles.get(vehicle_id).cloned())
    }

    async fn list_recent_logs(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MileageLogEntry>, LedgerError> {
        let mut logs = self.logs_for(vehicle_id)?;
        logs.retain(|l| l.timestamp >= since);
        Ok(logs)
    }

    async fn commit(&self, write: LedgerWrite) -> Result<Vehicle, LedgerError> {
        let mut state = self.lock()?;

        let updated = {
            let vehicle = state
                .vehicles
                .get_mut(&write.vehicle_id)
                .ok_or_else(|| LedgerError::not_found(&write.vehicle_id))?;
            vehicle.mileage = write.mileage;
            vehicle.warning_alert_sent = write.latches.warning_alert_sent;
            vehicle.critical_alert_sent = write.latches.critical_alert_sent;
            vehicle.updated_at = write.updated_at;
            vehicle.clone()
        };

        state.logs.push(write.log);
        if let Some(alert) = write.alert {
            state.alerts.push(alert);
        }
        if let Some(maintenance) = write.maintenance {
            state.maintenance.push(maintenance.record);
            self.push_activity(&mut state, maintenance.activity);
        }
        self.push_activity(&mut state, write.activity);

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::ledger::types::LatchState;

    fn make_write(vehicle_id: &str, from: f64, to: f64, seconds_ago: i64) -> LedgerWrite {
        let at = Utc::now() - Duration::seconds(seconds_ago);
        LedgerWrite {
            vehicle_id: vehicle_id.to_string(),
            mileage: to,
            latches: LatchState::cleared(),
            log: MileageLogEntry {
                id: format!("log_{}", to),
                vehicle_id: vehicle_id.to_string(),
                previous_mileage: from,
                new_mileage: to,
                miles_added: to - from,
                timestamp: at,
                logged_by: "tester".to_string(),
                notes: String::new(),
            },
            alert: None,
            activity: ActivityEntry::new("mileage", format!("to {}", to), "fa-road", Some(vehicle_id.to_string()), at),
            maintenance: None,
            updated_at: at,
        }
    }

    fn store_with_vehicle(id: &str) -> MemoryStore {
        let store = MemoryStore::new(3);
        store.put_vehicle(Vehicle::new(id, "ABC 1234", "Sedan")).unwrap();
        store
    }

    // ---- commit ----

    #[tokio::test]
    async fn commit_updates_vehicle_and_appends_log() {
        let store = store_with_vehicle("VH-001");
        let updated = store.commit(make_write("VH-001", 0.0, 120.0, 0)).await.unwrap();

        assert_eq!(updated.mileage, 120.0);
        assert_eq!(store.logs_for("VH-001").unwrap().len(), 1);
        assert_eq!(store.activity().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_for_missing_vehicle_is_not_found() {
        let store = MemoryStore::default();
        let err = store.commit(make_write("VH-404", 0.0, 10.0, 0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
        assert!(store.logs_for("VH-404").unwrap().is_empty());
    }

    #[tokio::test]
    async fn activity_evicts_oldest_when_at_capacity() {
        let store = store_with_vehicle("VH-001");
        for (i, to) in [10.0, 20.0, 30.0, 40.0].iter().enumerate() {
            store
                .commit(make_write("VH-001", *to - 10.0, *to, 10 - i as i64))
                .await
                .unwrap();
        }

        let activity = store.activity().unwrap();
        assert_eq!(activity.len(), 3);
        assert_eq!(activity[0].message, "to 40");
        assert_eq!(activity[2].message, "to 20");
    }

    // ---- list_recent_logs ----

    #[tokio::test]
    async fn list_recent_logs_filters_by_since_newest_first() {
        let store = store_with_vehicle("VH-001");
        store.commit(make_write("VH-001", 0.0, 100.0, 600)).await.unwrap();
        store.commit(make_write("VH-001", 100.0, 200.0, 30)).await.unwrap();
        store.commit(make_write("VH-001", 200.0, 300.0, 5)).await.unwrap();

        let since = Utc::now() - Duration::seconds(60);
        let recent = store.list_recent_logs("VH-001", since).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].new_mileage, 300.0);
        assert_eq!(recent[1].new_mileage, 200.0);
    }

    #[tokio::test]
    async fn list_recent_logs_ignores_other_vehicles() {
        let store = store_with_vehicle("VH-001");
        store.put_vehicle(Vehicle::new("VH-002", "DEF 5678", "SUV")).unwrap();
        store.commit(make_write("VH-002", 0.0, 50.0, 1)).await.unwrap();

        let since = Utc::now() - Duration::seconds(60);
        assert!(store.list_recent_logs("VH-001", since).await.unwrap().is_empty());
    }
}
