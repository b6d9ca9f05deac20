mod audit_log;
mod event;
mod statement;

pub use audit_log::{AuditAction, AuditTargetType, LedgerAuditLog, NewAuditEntry};
pub use event::{sort_events, EventMeta, EventType, LedgerEvent, LedgerTotals};
pub use statement::{AreaSummary, PharmacyStatement, PharmacySummary};
