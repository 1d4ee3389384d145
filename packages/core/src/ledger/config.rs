//! Threshold configuration for alert evaluation

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MILEAGE: f64 = 5000.0;
pub const DEFAULT_WARNING_THRESHOLD: f64 = 200.0;

/// Window in which an identical reading counts as a double submission.
pub const DUPLICATE_WINDOW_SECONDS: i64 = 60;

/// Mileage limits used to derive status and fire alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub max_mileage: f64,
    pub warning_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_mileage: DEFAULT_MAX_MILEAGE,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(max_mileage: f64, warning_threshold: f64) -> Self {
        Self {
            max_mileage,
            warning_threshold,
        }
    }

    /// Miles left before `mileage` reaches the limit (negative once exceeded).
    pub fn remaining(&self, mileage: f64) -> f64 {
        self.max_mileage - mileage
    }
}

pub fn duplicate_window() -> Duration {
    Duration::seconds(DUPLICATE_WINDOW_SECONDS)
}
