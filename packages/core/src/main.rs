use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;
use tower_http::cors::CorsLayer;

use fleet_mileage_tracker::{
    alerts::AlertNotifier,
    api::{create_router, AppState},
    cli::Cli,
    config::Config,
    db,
    error::AppError,
    logging::init_logging,
    metrics::AppMetrics,
    repository::FleetRepository,
    scheduler::run_housekeeping,
    seed::seed_sample_fleet,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env()
        .and_then(|config| config.with_cli(&cli))
        .map_err(AppError::Config)?;

    tracing::info!(
        database_url = %config.database_url,
        port = config.api_port,
        max_mileage = config.default_thresholds.max_mileage,
        warning_threshold = config.default_thresholds.warning_threshold,
        webhook = config.alert_webhook_url.is_some(),
        "Service starting"
    );

    ensure_database_dir(&config.database_url)?;
    let pool = db::create_pool(&config.database_url).await?;
    let repository = Arc::new(FleetRepository::new(pool));

    if cli.seed {
        seed_sample_fleet(&repository, &config.default_thresholds).await?;
    }

    let metrics = Arc::new(AppMetrics::new().map_err(|e| AppError::Config(e.to_string()))?);
    let notifier = match &config.alert_webhook_url {
        Some(url) => Some(Arc::new(
            AlertNotifier::new(url.clone()).map_err(|e| AppError::Config(e.to_string()))?,
        )),
        None => None,
    };

    tokio::spawn(run_housekeeping(
        repository.clone(),
        config.activity_retention,
        config.housekeeping_interval_seconds,
    ));

    let state = AppState::new(repository, metrics, notifier, config.default_thresholds);
    let app = create_router(state).layer(CorsLayer::very_permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// SQLite creates the file but not its parent directory.
fn ensure_database_dir(database_url: &str) -> Result<(), AppError> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
