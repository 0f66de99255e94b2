//! chbackupd library
//!
//! Scheduled orchestration of clickhouse-backup create and upload runs.

pub mod app;
pub mod backup;
pub mod errors;
pub mod http;
pub mod logs;
pub mod metrics;
pub mod models;
pub mod server;
pub mod settings;
pub mod utils;
pub mod workers;
