//! Statement, summary and area roll-up responses.

use serde::{Deserialize, Serialize};

use super::event::{LedgerEvent, LedgerTotals};

/// All events for one legacy account plus their totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacyStatement {
    pub pharmacy_legacy_id: String,
    pub year: String,
    pub events: Vec<LedgerEvent>,
    pub summary: LedgerTotals,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Totals only. Always derived from a `PharmacyStatement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacySummary {
    pub pharmacy_legacy_id: String,
    pub year: String,
    pub totals: LedgerTotals,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl From<PharmacyStatement> for PharmacySummary {
    fn from(statement: PharmacyStatement) -> Self {
        Self {
            pharmacy_legacy_id: statement.pharmacy_legacy_id,
            year: statement.year,
            totals: statement.summary,
            warnings: statement.warnings,
        }
    }
}

/// Per-account summaries for every account in an area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaSummary {
    pub area_id: String,
    pub year: String,
    pub pharmacies: Vec<PharmacySummary>,
    pub totals: LedgerTotals,
    #[serde(default)]
    pub warnings: Vec<String>,
}
