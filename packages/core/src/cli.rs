use clap::Parser;

/// Fleet Mileage Tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "fleet-mileage-tracker",
    version,
    about = "Odometer ledger and mileage alerts for a vehicle fleet"
)]
pub struct Cli {
    /// SQLite database URL (e.g. sqlite://data/fleet.db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// HTTP listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Default mileage limit before a vehicle needs service
    #[arg(long)]
    pub max_mileage: Option<f64>,

    /// Miles before the limit at which a warning is raised
    #[arg(long)]
    pub warning_threshold: Option<f64>,

    /// Insert the sample fleet when the database has no vehicles
    #[arg(long, default_value_t = false)]
    pub seed: bool,
}
