//! Name matching that maps unknown legacy schemas onto fixed roles.
//!
//! Every role has an ordered list of candidate names. Candidates are tried in
//! priority order; for each candidate an exact case-insensitive comparison is
//! tried first, then a comparison with underscores stripped from both sides.
//! The first candidate that matches anything wins, so a looser match on an
//! earlier candidate beats an exact match on a later one.

use serde::Serialize;

use crate::models::EventType;

pub const PHARMACY_TABLE_CANDIDATES: &[&str] = &[
    "pharmacies",
    "pharmacy",
    "customers",
    "customer",
    "accounts",
    "account",
    "clients",
    "client",
];
pub const INVOICE_TABLE_CANDIDATES: &[&str] = &[
    "invoices",
    "invoice",
    "sales_invoices",
    "salesinvoice",
    "acc_invoice",
    "main_invoice",
];
pub const RETURN_TABLE_CANDIDATES: &[&str] = &[
    "returns",
    "sales_returns",
    "returns_invoice",
    "credit_notes",
    "creditnote",
];
pub const CASH_RECEIPT_TABLE_CANDIDATES: &[&str] =
    &["receipts", "cash_receipts", "cashreceipt", "cash_rec"];
pub const CHEQUE_RECEIPT_TABLE_CANDIDATES: &[&str] = &[
    "cheques",
    "cheque_receipts",
    "cheque_rec",
    "chequereceipts",
    "bank_receipts",
];

pub const ACCOUNT_COLUMN_CANDIDATES: &[&str] = &[
    "pharmacyid",
    "pharmacy_id",
    "customerid",
    "customer_id",
    "accountid",
    "account_id",
    "clientid",
    "client_id",
];
pub const DATE_COLUMN_CANDIDATES: &[&str] =
    &["date", "doc_date", "invoice_date", "trans_date", "entrydate"];
pub const AMOUNT_COLUMN_CANDIDATES: &[&str] =
    &["net", "total", "amount", "grand_total", "balance", "value"];
pub const REFERENCE_COLUMN_CANDIDATES: &[&str] =
    &["number", "no", "reference", "doc_no", "invoice_no", "serial"];
pub const AREA_COLUMN_CANDIDATES: &[&str] = &["area", "area_id", "territoryid", "territory"];

fn strip_underscores(name: &str) -> String {
    name.replace('_', "").to_lowercase()
}

/// Position in `available` of the best match for `candidates`, if any.
pub fn resolve_index(available: &[&str], candidates: &[&str]) -> Option<usize> {
    let stripped: Vec<String> = available.iter().map(|n| strip_underscores(n)).collect();

    for candidate in candidates {
        if let Some(i) = available
            .iter()
            .position(|name| name.eq_ignore_ascii_case(candidate))
        {
            return Some(i);
        }

        let key = strip_underscores(candidate);
        if let Some(i) = stripped.iter().position(|name| *name == key) {
            return Some(i);
        }
    }

    None
}

/// The real name in `available` selected for `candidates`.
pub fn resolve_name<'a>(available: &[&'a str], candidates: &[&str]) -> Option<&'a str> {
    resolve_index(available, candidates).map(|i| available[i])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type, empty when the column was declared without one.
    pub data_type: String,
}

/// A reflected table: its real name and columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns
                .iter()
                .map(|c| ColumnSchema {
                    name: c.to_string(),
                    data_type: String::new(),
                })
                .collect(),
        }
    }

    /// Real column name filling the role described by `candidates`.
    pub fn resolve_column(&self, candidates: &[&str]) -> Option<&str> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        resolve_name(&names, candidates)
    }
}

pub fn resolve_table<'a>(tables: &'a [TableSchema], candidates: &[&str]) -> Option<&'a TableSchema> {
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    resolve_index(&names, candidates).map(|i| &tables[i])
}

/// Role-tagged tables discovered in one partition. Any role may be missing.
#[derive(Debug, Clone, Default)]
pub struct LedgerTables {
    pub pharmacies: Option<TableSchema>,
    pub invoices: Option<TableSchema>,
    pub returns: Option<TableSchema>,
    pub receipts_cash: Option<TableSchema>,
    pub receipts_cheque: Option<TableSchema>,
}

impl LedgerTables {
    pub fn from_tables(tables: &[TableSchema]) -> Self {
        let pick = |candidates: &[&str]| resolve_table(tables, candidates).cloned();
        Self {
            pharmacies: pick(PHARMACY_TABLE_CANDIDATES),
            invoices: pick(INVOICE_TABLE_CANDIDATES),
            returns: pick(RETURN_TABLE_CANDIDATES),
            receipts_cash: pick(CASH_RECEIPT_TABLE_CANDIDATES),
            receipts_cheque: pick(CHEQUE_RECEIPT_TABLE_CANDIDATES),
        }
    }

    pub fn event_table(&self, event_type: EventType) -> Option<&TableSchema> {
        match event_type {
            EventType::Invoice => self.invoices.as_ref(),
            EventType::Return => self.returns.as_ref(),
            EventType::CashReceipt => self.receipts_cash.as_ref(),
            EventType::ChequeReceipt => self.receipts_cheque.as_ref(),
        }
    }
}
