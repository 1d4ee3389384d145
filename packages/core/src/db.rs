//! SQLite connection pool and schema bootstrap.
//!
//! [`create_pool`] is the only way the service opens the database. Tables
//! are created with `IF NOT EXISTS` on every start, so pointing the service
//! at an existing file is safe.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS vehicles (
        id TEXT PRIMARY KEY,
        registration TEXT NOT NULL,
        type TEXT NOT NULL,
        driver TEXT,
        mileage REAL NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'inactive')),
        fuel_type TEXT NOT NULL DEFAULT 'Diesel',
        year INTEGER,
        department TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT '',
        registration_date TEXT,
        registration_expiry TEXT,
        insurance_date TEXT,
        insurance_expiry TEXT,
        warning_alert_sent INTEGER NOT NULL DEFAULT 0,
        critical_alert_sent INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS mileage_logs (
        id TEXT PRIMARY KEY,
        vehicle_id TEXT NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        previous_mileage REAL NOT NULL,
        new_mileage REAL NOT NULL,
        miles_added REAL NOT NULL,
        logged_by TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT '',
        timestamp TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_mileage_logs_vehicle_ts
        ON mileage_logs (vehicle_id, timestamp)",
    "CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        vehicle_id TEXT NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        type TEXT NOT NULL CHECK(type IN ('warning', 'critical')),
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        read INTEGER NOT NULL DEFAULT 0,
        timestamp TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS activity_log (
        id TEXT PRIMARY KEY,
        type TEXT NOT NULL,
        message TEXT NOT NULL,
        icon TEXT NOT NULL DEFAULT 'fa-info-circle',
        vehicle_id TEXT,
        timestamp TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS maintenance_logs (
        id TEXT PRIMARY KEY,
        vehicle_id TEXT NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        artisan_name TEXT NOT NULL,
        company_name TEXT NOT NULL DEFAULT '',
        contact_number TEXT NOT NULL,
        repair_work TEXT NOT NULL,
        maintenance_date TEXT NOT NULL,
        cost REAL NOT NULL DEFAULT 0,
        notes TEXT NOT NULL DEFAULT '',
        submitted_by TEXT NOT NULL,
        reset_mileage INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
];

/// Open a pool for `database_url` and make sure all tables exist.
///
/// In-memory URLs get a single connection that never expires; every
/// connection to `sqlite::memory:` is otherwise a separate empty database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;
    run_schema(&pool).await?;
    Ok(pool)
}

async fn run_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Database schema ready ({} statements)", SCHEMA.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn create_pool_creates_all_tables() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();

        for table in [
            "activity_log",
            "alerts",
            "maintenance_logs",
            "mileage_logs",
            "settings",
            "vehicles",
        ] {
            assert!(names.iter().any(|n| n == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        assert!(run_schema(&pool).await.is_ok());
    }
}
