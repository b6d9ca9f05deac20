pub mod audit;
pub mod health;
pub mod ledger;
pub mod schema;

pub use audit::list_audit_entries;
pub use health::{health_check, metrics_handler, readiness_check};
pub use ledger::{area_summary, pharmacy_statement, pharmacy_summary};
pub use schema::ledger_schema;

use axum::extract::rejection::QueryRejection;
use service_core::error::AppError;

/// Roles allowed to read statements and summaries.
pub const LEDGER_READ_ROLES: &[&str] = &["admin", "sales_manager"];

/// Roles allowed to inspect schemas and the audit trail.
pub const LEDGER_ADMIN_ROLES: &[&str] = &["admin"];

pub(crate) fn query_error(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{}", rejection.body_text()))
}
