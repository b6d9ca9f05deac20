//! Services module for dpm-ledger-service.

pub mod database;
pub mod metrics;

pub use database::{AuditFilter, Database};
pub use metrics::{get_metrics, init_metrics, record_request};
