use chrono::NaiveDate;
use serde::Deserialize;

use crate::ledger::DateRange;

/// Query string shared by the statement and summary endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerParams {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub year: Option<String>,
}

impl LedgerParams {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.date_from, self.date_to)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaParams {
    pub year: Option<String>,
}
