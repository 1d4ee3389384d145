use std::env;
use std::str::FromStr;

use crate::cli::Cli;
use crate::ledger::{Thresholds, DEFAULT_MAX_MILEAGE, DEFAULT_WARNING_THRESHOLD};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/fleet.db";
pub const DEFAULT_API_PORT: u16 = 3000;
pub const DEFAULT_ACTIVITY_RETENTION: i64 = 100;
pub const DEFAULT_HOUSEKEEPING_INTERVAL_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_port: u16,
    /// Used when no thresholds have been saved through the settings API.
    pub default_thresholds: Thresholds,
    pub alert_webhook_url: Option<String>,
    pub activity_retention: i64,
    pub housekeeping_interval_seconds: u64,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let api_port = parse_var("API_PORT", DEFAULT_API_PORT)?;
        let max_mileage = parse_var("MAX_MILEAGE", DEFAULT_MAX_MILEAGE)?;
        let warning_threshold = parse_var("WARNING_THRESHOLD", DEFAULT_WARNING_THRESHOLD)?;
        let activity_retention = parse_var("ACTIVITY_RETENTION", DEFAULT_ACTIVITY_RETENTION)?;
        let housekeeping_interval_seconds = parse_var(
            "HOUSEKEEPING_INTERVAL_SECONDS",
            DEFAULT_HOUSEKEEPING_INTERVAL_SECONDS,
        )?;

        let alert_webhook_url = env::var("ALERT_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let config = Self {
            database_url,
            api_port,
            default_thresholds: Thresholds::new(max_mileage, warning_threshold),
            alert_webhook_url,
            activity_retention,
            housekeeping_interval_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides on top of the environment.
    pub fn with_cli(mut self, cli: &Cli) -> Result<Self, String> {
        if let Some(url) = &cli.database_url {
            self.database_url = url.clone();
        }
        if let Some(port) = cli.port {
            self.api_port = port;
        }
        if let Some(max) = cli.max_mileage {
            self.default_thresholds.max_mileage = max;
        }
        if let Some(warning) = cli.warning_threshold {
            self.default_thresholds.warning_threshold = warning;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), String> {
        let t = &self.default_thresholds;
        if !(t.max_mileage.is_finite() && t.max_mileage > 0.0) {
            return Err("MAX_MILEAGE must be positive".to_string());
        }
        if !(t.warning_threshold.is_finite() && t.warning_threshold > 0.0) {
            return Err("WARNING_THRESHOLD must be positive".to_string());
        }
        if t.warning_threshold >= t.max_mileage {
            return Err("WARNING_THRESHOLD must be less than MAX_MILEAGE".to_string());
        }
        if self.housekeeping_interval_seconds == 0 {
            return Err("HOUSEKEEPING_INTERVAL_SECONDS must be greater than 0".to_string());
        }
        Ok(())
    }
}
