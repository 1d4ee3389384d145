//! Housekeeping scheduler.
//!
//! Keeps the activity feed bounded: each tick deletes everything but the
//! newest `retention` entries. Mileage logs, alerts, and maintenance
//! records are history and are never pruned.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time;

use crate::repository::FleetRepository;

/// Run the housekeeping loop until `Ctrl+C` (SIGINT) is received.
///
/// A failed tick is logged and the loop continues.
pub async fn run_housekeeping(
    repository: Arc<FleetRepository>,
    retention: i64,
    interval_seconds: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_seconds));

    tracing::info!(
        "Housekeeping started (interval: {}s, activity retention: {})",
        interval_seconds,
        retention
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                prune_once(&repository, retention).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping housekeeping.");
                break;
            }
        }
    }

    tracing::info!("Housekeeping stopped cleanly");
}

/// Execute a single housekeeping pass. Returns the number of rows pruned.
async fn prune_once(repository: &FleetRepository, retention: i64) -> u64 {
    match repository.prune_activity(retention).await {
        Ok(0) => 0,
        Ok(deleted) => {
            tracing::info!("Pruned {} activity entries", deleted);
            deleted
        }
        Err(err) => {
            tracing::error!("Housekeeping error, skipping tick: {}", err);
            0
        }
    }
}
