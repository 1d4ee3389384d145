//! Database repository for fleet persistence.
//!
//! All SQLite read/write logic lives here. The ledger reaches the database
//! only through the [`FleetStore`] impl at the bottom of this file, whose
//! `commit` applies the log, vehicle, alert, and activity writes in one
//! transaction. Everything else is plain CRUD used by the HTTP layer.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision and
//! booleans as 0/1 integers.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::ledger::{
    ActivityEntry, Alert, AlertSeverity, LedgerError, LedgerWrite, MileageLogEntry, Thresholds,
    Vehicle, VehicleLifecycle,
};

pub use crate::ledger::MaintenanceRecord;
use crate::store::FleetStore;

/// Hard cap on list endpoints.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Fleet-wide settings persisted as key/value rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub max_mileage: f64,
    pub warning_threshold: f64,
    pub email_alerts: bool,
    pub push_alerts: bool,
    pub driver_see_mileage: bool,
}

impl Settings {
    /// Settings with the given thresholds and default notification flags.
    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self {
            max_mileage: thresholds.max_mileage,
            warning_threshold: thresholds.warning_threshold,
            email_alerts: true,
            push_alerts: false,
            driver_see_mileage: true,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.max_mileage, self.warning_threshold)
    }

    fn to_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("maxMileage", self.max_mileage.to_string()),
            ("warningThreshold", self.warning_threshold.to_string()),
            ("emailAlerts", self.email_alerts.to_string()),
            ("pushAlerts", self.push_alerts.to_string()),
            ("driverSeeMileage", self.driver_see_mileage.to_string()),
        ]
    }

    fn apply_pair(&mut self, key: &str, value: &str) {
        match key {
            "maxMileage" => {
                if let Ok(v) = value.parse() {
                    self.max_mileage = v;
                }
            }
            "warningThreshold" => {
                if let Ok(v) = value.parse() {
                    self.warning_threshold = v;
                }
            }
            "emailAlerts" => {
                if let Ok(v) = value.parse() {
                    self.email_alerts = v;
                }
            }
            "pushAlerts" => {
                if let Ok(v) = value.parse() {
                    self.push_alerts = v;
                }
            }
            "driverSeeMileage" => {
                if let Ok(v) = value.parse() {
                    self.driver_see_mileage = v;
                }
            }
            other => tracing::debug!("Ignoring unknown setting '{}'", other),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_thresholds(Thresholds::default())
    }
}

/// Repository for reading and writing fleet data to SQLite.
pub struct FleetRepository {
    pool: SqlitePool,
}

/// Fixed-width UTC form so timestamps sort correctly as text.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn vehicle_from_row(row: &SqliteRow) -> Option<Vehicle> {
    let status: String = row.try_get("status").ok()?;
    let warning: i64 = row.try_get("warning_alert_sent").ok()?;
    let critical: i64 = row.try_get("critical_alert_sent").ok()?;
    let created_at: String = row.try_get("created_at").ok()?;
    let updated_at: String = row.try_get("updated_at").ok()?;

    Some(Vehicle {
        id: row.try_get("id").ok()?,
        registration: row.try_get("registration").ok()?,
        kind: row.try_get("type").ok()?,
        driver: row.try_get("driver").ok()?,
        mileage: row.try_get("mileage").ok()?,
        status: VehicleLifecycle::parse(&status)?,
        fuel_type: row.try_get("fuel_type").ok()?,
        year: row.try_get("year").ok()?,
        department: row.try_get("department").ok()?,
        notes: row.try_get("notes").ok()?,
        registration_date: row.try_get("registration_date").ok()?,
        registration_expiry: row.try_get("registration_expiry").ok()?,
        insurance_date: row.try_get("insurance_date").ok()?,
        insurance_expiry: row.try_get("insurance_expiry").ok()?,
        warning_alert_sent: warning != 0,
        critical_alert_sent: critical != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn log_from_row(row: &SqliteRow) -> Option<MileageLogEntry> {
    let timestamp: String = row.try_get("timestamp").ok()?;
    Some(MileageLogEntry {
        id: row.try_get("id").ok()?,
        vehicle_id: row.try_get("vehicle_id").ok()?,
        previous_mileage: row.try_get("previous_mileage").ok()?,
        new_mileage: row.try_get("new_mileage").ok()?,
        miles_added: row.try_get("miles_added").ok()?,
        timestamp: parse_timestamp(&timestamp)?,
        logged_by: row.try_get("logged_by").ok()?,
        notes: row.try_get("notes").ok()?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Option<Alert> {
    let severity: String = row.try_get("type").ok()?;
    let read: i64 = row.try_get("read").ok()?;
    let timestamp: String = row.try_get("timestamp").ok()?;
    Some(Alert {
        id: row.try_get("id").ok()?,
        vehicle_id: row.try_get("vehicle_id").ok()?,
        severity: AlertSeverity::parse(&severity)?,
        title: row.try_get("title").ok()?,
        message: row.try_get("message").ok()?,
        timestamp: parse_timestamp(&timestamp)?,
        read: read != 0,
    })
}

fn activity_from_row(row: &SqliteRow) -> Option<ActivityEntry> {
    let timestamp: String = row.try_get("timestamp").ok()?;
    Some(ActivityEntry {
        id: row.try_get("id").ok()?,
        kind: row.try_get("type").ok()?,
        message: row.try_get("message").ok()?,
        icon: row.try_get("icon").ok()?,
        vehicle_id: row.try_get("vehicle_id").ok()?,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

fn maintenance_from_row(row: &SqliteRow) -> Option<MaintenanceRecord> {
    let reset: i64 = row.try_get("reset_mileage").ok()?;
    let created_at: String = row.try_get("created_at").ok()?;
    Some(MaintenanceRecord {
        id: row.try_get("id").ok()?,
        vehicle_id: row.try_get("vehicle_id").ok()?,
        artisan_name: row.try_get("artisan_name").ok()?,
        company_name: row.try_get("company_name").ok()?,
        contact_number: row.try_get("contact_number").ok()?,
        repair_work: row.try_get("repair_work").ok()?,
        maintenance_date: row.try_get("maintenance_date").ok()?,
        cost: row.try_get("cost").ok()?,
        notes: row.try_get("notes").ok()?,
        submitted_by: row.try_get("submitted_by").ok()?,
        reset_mileage: reset != 0,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl FleetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- Vehicles ----

    /// Insert a vehicle and its `vehicle_added` activity entry.
    pub async fn insert_vehicle(
        &self,
        vehicle: &Vehicle,
        activity: &ActivityEntry,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO vehicles
             (id, registration, type, driver, mileage, status, fuel_type, year, department,
              notes, registration_date, registration_expiry, insurance_date, insurance_expiry,
              warning_alert_sent, critical_alert_sent, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&vehicle.id)
        .bind(&vehicle.registration)
        .bind(&vehicle.kind)
        .bind(&vehicle.driver)
        .bind(vehicle.mileage)
        .bind(vehicle.status.as_str())
        .bind(&vehicle.fuel_type)
        .bind(vehicle.year)
        .bind(&vehicle.department)
        .bind(&vehicle.notes)
        .bind(&vehicle.registration_date)
        .bind(&vehicle.registration_expiry)
        .bind(&vehicle.insurance_date)
        .bind(&vehicle.insurance_expiry)
        .bind(vehicle.warning_alert_sent as i64)
        .bind(vehicle.critical_alert_sent as i64)
        .bind(format_timestamp(&vehicle.created_at))
        .bind(format_timestamp(&vehicle.updated_at))
        .execute(&mut *tx)
        .await?;

        insert_activity_with(&mut tx, activity).await?;

        tx.commit().await?;
        Ok(())
    }

    /// All vehicles ordered by registration.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM vehicles ORDER BY registration ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().filter_map(vehicle_from_row).collect())
    }

    pub async fn fetch_vehicle(&self, id: &str) -> Result<Option<Vehicle>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM vehicles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().and_then(vehicle_from_row))
    }

    /// Ids of vehicles whose assigned driver is `driver`.
    pub async fn vehicle_ids_for_driver(&self, driver: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM vehicles WHERE driver = ? ORDER BY id ASC")
            .bind(driver)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("id").ok())
            .collect())
    }

    /// Write the descriptive fields of `vehicle`. Mileage and alert latches
    /// are owned by the ledger and never touched here.
    /// Returns `true` if a row was updated, `false` if id not found.
    pub async fn update_vehicle_details(
        &self,
        vehicle: &Vehicle,
        activity: &ActivityEntry,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE vehicles SET registration = ?, type = ?, driver = ?, status = ?,
             fuel_type = ?, year = ?, department = ?, notes = ?, registration_date = ?,
             registration_expiry = ?, insurance_date = ?, insurance_expiry = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&vehicle.registration)
        .bind(&vehicle.kind)
        .bind(&vehicle.driver)
        .bind(vehicle.status.as_str())
        .bind(&vehicle.fuel_type)
        .bind(vehicle.year)
        .bind(&vehicle.department)
        .bind(&vehicle.notes)
        .bind(&vehicle.registration_date)
        .bind(&vehicle.registration_expiry)
        .bind(&vehicle.insurance_date)
        .bind(&vehicle.insurance_expiry)
        .bind(format_timestamp(&vehicle.updated_at))
        .bind(&vehicle.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        insert_activity_with(&mut tx, activity).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Delete a vehicle; its logs, alerts, and maintenance records cascade.
    /// Returns `true` if a row was deleted.
    pub async fn delete_vehicle(
        &self,
        id: &str,
        activity: &ActivityEntry,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        insert_activity_with(&mut tx, activity).await?;
        tx.commit().await?;
        Ok(true)
    }

    // ---- Mileage logs ----

    /// Mileage logs newest first, optionally for one vehicle. `limit` is
    /// clamped to [`MAX_LIST_LIMIT`].
    pub async fn list_logs(
        &self,
        vehicle_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MileageLogEntry>, sqlx::Error> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);

        let rows = match vehicle_id {
            Some(id) => {
                sqlx::query(
                    "SELECT * FROM mileage_logs WHERE vehicle_id = ?
                     ORDER BY timestamp DESC LIMIT ?",
                )
                .bind(id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM mileage_logs ORDER BY timestamp DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().filter_map(log_from_row).collect())
    }

    // ---- Alerts ----

    /// Alerts newest first. `vehicle_ids = Some(..)` restricts the result to
    /// those vehicles.
    pub async fn list_alerts(
        &self,
        vehicle_ids: Option<&[String]>,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let rows = match vehicle_ids {
            Some([]) => return Ok(Vec::new()),
            Some(ids) => {
                let sql = format!(
                    "SELECT * FROM alerts WHERE vehicle_id IN ({}) ORDER BY timestamp DESC",
                    placeholders(ids.len())
                );
                let mut q = sqlx::query(&sql);
                for id in ids {
                    q = q.bind(id);
                }
                q.fetch_all(&self.pool).await?
            }
            None => {
                sqlx::query("SELECT * FROM alerts ORDER BY timestamp DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().filter_map(alert_from_row).collect())
    }

    /// Mark one alert read, optionally only if it belongs to one of
    /// `vehicle_ids`. Returns `true` if a matching alert exists.
    pub async fn mark_alert_read(
        &self,
        id: &str,
        vehicle_ids: Option<&[String]>,
    ) -> Result<bool, sqlx::Error> {
        let result = match vehicle_ids {
            Some([]) => return Ok(false),
            Some(ids) => {
                let sql = format!(
                    "UPDATE alerts SET read = 1 WHERE id = ? AND vehicle_id IN ({})",
                    placeholders(ids.len())
                );
                let mut q = sqlx::query(&sql).bind(id);
                for vehicle_id in ids {
                    q = q.bind(vehicle_id);
                }
                q.execute(&self.pool).await?
            }
            None => {
                sqlx::query("UPDATE alerts SET read = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread alert read, optionally only for `vehicle_ids`.
    /// Returns the number of alerts changed.
    pub async fn mark_all_alerts_read(
        &self,
        vehicle_ids: Option<&[String]>,
    ) -> Result<u64, sqlx::Error> {
        let result = match vehicle_ids {
            Some([]) => return Ok(0),
            Some(ids) => {
                let sql = format!(
                    "UPDATE alerts SET read = 1 WHERE read = 0 AND vehicle_id IN ({})",
                    placeholders(ids.len())
                );
                let mut q = sqlx::query(&sql);
                for id in ids {
                    q = q.bind(id);
                }
                q.execute(&self.pool).await?
            }
            None => {
                sqlx::query("UPDATE alerts SET read = 1 WHERE read = 0")
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    // ---- Activity ----

    pub async fn insert_activity(&self, entry: &ActivityEntry) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(
            "INSERT INTO activity_log (id, type, message, icon, vehicle_id, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.kind)
        .bind(&entry.message)
        .bind(&entry.icon)
        .bind(&entry.vehicle_id)
        .bind(format_timestamp(&entry.timestamp))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Newest `limit` activity entries.
    pub async fn list_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        let rows = sqlx::query("SELECT * FROM activity_log ORDER BY timestamp DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().filter_map(activity_from_row).collect())
    }

    /// Delete all but the newest `keep` activity entries.
    /// Returns the number of rows deleted.
    pub async fn prune_activity(&self, keep: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM activity_log WHERE id NOT IN
             (SELECT id FROM activity_log ORDER BY timestamp DESC LIMIT ?)",
        )
        .bind(keep.max(0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ---- Maintenance ----

    /// Insert a maintenance record and its `maintenance` activity entry.
    ///
    /// Records that reset mileage go through the ledger instead, so the
    /// record and the reset commit together.
    pub async fn insert_maintenance(
        &self,
        record: &MaintenanceRecord,
        activity: &ActivityEntry,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        insert_maintenance_with(&mut tx, record).await?;
        insert_activity_with(&mut tx, activity).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Maintenance records newest first, optionally restricted to `vehicle_ids`.
    pub async fn list_maintenance(
        &self,
        vehicle_ids: Option<&[String]>,
    ) -> Result<Vec<MaintenanceRecord>, sqlx::Error> {
        let rows = match vehicle_ids {
            Some([]) => return Ok(Vec::new()),
            Some(ids) => {
                let sql = format!(
                    "SELECT * FROM maintenance_logs WHERE vehicle_id IN ({})
                     ORDER BY created_at DESC",
                    placeholders(ids.len())
                );
                let mut q = sqlx::query(&sql);
                for id in ids {
                    q = q.bind(id);
                }
                q.fetch_all(&self.pool).await?
            }
            None => {
                sqlx::query("SELECT * FROM maintenance_logs ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().filter_map(maintenance_from_row).collect())
    }

    /// Returns `true` if a record was deleted.
    pub async fn delete_maintenance(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maintenance_logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- Settings ----

    /// Stored settings layered over `defaults`.
    pub async fn load_settings(&self, defaults: &Settings) -> Result<Settings, sqlx::Error> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        let mut settings = defaults.clone();
        for row in &rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            settings.apply_pair(&key, &value);
        }
        Ok(settings)
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.to_pairs() {
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count_vehicles(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM vehicles")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("cnt")
    }
}

async fn insert_maintenance_with(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record: &MaintenanceRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO maintenance_logs
         (id, vehicle_id, artisan_name, company_name, contact_number, repair_work,
          maintenance_date, cost, notes, submitted_by, reset_mileage, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.vehicle_id)
    .bind(&record.artisan_name)
    .bind(&record.company_name)
    .bind(&record.contact_number)
    .bind(&record.repair_work)
    .bind(&record.maintenance_date)
    .bind(record.cost)
    .bind(&record.notes)
    .bind(&record.submitted_by)
    .bind(record.reset_mileage as i64)
    .bind(format_timestamp(&record.created_at))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_activity_with(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &ActivityEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_log (id, type, message, icon, vehicle_id, timestamp)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.kind)
    .bind(&entry.message)
    .bind(&entry.icon)
    .bind(&entry.vehicle_id)
    .bind(format_timestamp(&entry.timestamp))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl FleetStore for FleetRepository {
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>, LedgerError> {
        Ok(self.fetch_vehicle(vehicle_id).await?)
    }

    async fn list_recent_logs(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MileageLogEntry>, LedgerError> {
        let rows = sqlx::query(
            "SELECT * FROM mileage_logs WHERE vehicle_id = ? AND timestamp >= ?
             ORDER BY timestamp DESC",
        )
        .bind(vehicle_id)
        .bind(format_timestamp(&since))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(log_from_row).collect())
    }

    async fn commit(&self, write: LedgerWrite) -> Result<Vehicle, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE vehicles SET mileage = ?, warning_alert_sent = ?, critical_alert_sent = ?,
             updated_at = ? WHERE id = ?",
        )
        .bind(write.mileage)
        .bind(write.latches.warning_alert_sent as i64)
        .bind(write.latches.critical_alert_sent as i64)
        .bind(format_timestamp(&write.updated_at))
        .bind(&write.vehicle_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found(&write.vehicle_id));
        }

        let log = &write.log;
        sqlx::query(
            "INSERT INTO mileage_logs
             (id, vehicle_id, previous_mileage, new_mileage, miles_added, logged_by, notes, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&log.id)
        .bind(&log.vehicle_id)
        .bind(log.previous_mileage)
        .bind(log.new_mileage)
        .bind(log.miles_added)
        .bind(&log.logged_by)
        .bind(&log.notes)
        .bind(format_timestamp(&log.timestamp))
        .execute(&mut *tx)
        .await?;

        if let Some(alert) = &write.alert {
            sqlx::query(
                "INSERT INTO alerts (id, vehicle_id, type, title, message, read, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&alert.id)
            .bind(&alert.vehicle_id)
            .bind(alert.severity.as_str())
            .bind(&alert.title)
            .bind(&alert.message)
            .bind(alert.read as i64)
            .bind(format_timestamp(&alert.timestamp))
            .execute(&mut *tx)
            .await?;
        }

        if let Some(maintenance) = &write.maintenance {
            insert_maintenance_with(&mut tx, &maintenance.record).await?;
            insert_activity_with(&mut tx, &maintenance.activity).await?;
        }

        insert_activity_with(&mut tx, &write.activity).await?;

        // Read back before committing so a failed read aborts the whole write.
        let row = sqlx::query("SELECT * FROM vehicles WHERE id = ?")
            .bind(&write.vehicle_id)
            .fetch_optional(&mut *tx)
            .await?;
        let updated = row
            .as_ref()
            .and_then(vehicle_from_row)
            .ok_or_else(|| LedgerError::store_unavailable("updated vehicle row is unreadable"))?;

        tx.commit().await?;
        Ok(updated)
    }
}
