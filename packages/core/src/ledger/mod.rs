//! Mileage ledger: reading acceptance, threshold alerts, and maintenance resets

pub mod config;
pub mod engine;
pub mod error;
pub mod status;
pub mod types;


pub use config::*;
pub use engine::*;
pub use error::*;
pub use status::*;
pub use types::*;
