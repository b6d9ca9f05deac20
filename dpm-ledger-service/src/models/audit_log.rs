//! Audit trail of statement reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What the caller did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ViewStatement,
    ExportStatement,
    Other,
}

impl AuditAction {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewStatement => "view_statement",
            Self::ExportStatement => "export_statement",
            Self::Other => "other",
        }
    }
}

/// What kind of ledger target was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    Pharmacy,
    Area,
}

impl AuditTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pharmacy => "pharmacy",
            Self::Area => "area",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pharmacy" => Some(Self::Pharmacy),
            "area" => Some(Self::Area),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: String,
    pub meta: serde_json::Value,
}

impl NewAuditEntry {
    /// A `view_statement` entry tagged with the response mode.
    pub fn view_statement(
        user_id: Option<i64>,
        target_type: AuditTargetType,
        target_id: impl Into<String>,
        mode: &str,
    ) -> Self {
        Self {
            user_id,
            action: AuditAction::ViewStatement,
            target_type,
            target_id: target_id.into(),
            meta: serde_json::json!({ "mode": mode }),
        }
    }
}

/// Stored audit row. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerAuditLog {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    #[sqlx(json)]
    pub meta: serde_json::Value,
}
