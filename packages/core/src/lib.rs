// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod alerts;
pub mod api;
pub mod db;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod repository;
pub mod scheduler;
pub mod seed;
pub mod store;

// Startup-only modules; public so the binary can reach them through the lib.
pub mod cli;
pub mod config;
pub mod logging;
