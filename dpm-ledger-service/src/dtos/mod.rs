pub mod audit;
pub mod ledger;

pub use audit::{AuditListParams, AuditListResponse};
pub use ledger::{LedgerParams, SchemaParams};
