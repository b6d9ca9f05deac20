//! Read-only access to the legacy ledger partitions.
//!
//! Each fiscal year is split across up to three SQLite files whose schemas are
//! not known in advance. `matcher` maps whatever tables and columns exist onto
//! fixed roles, `aggregator` turns matching rows into per-account statements,
//! and `report` describes the raw schemas for operators.

pub mod aggregator;
pub mod matcher;
pub mod normalize;
pub mod partition;
pub mod reflect;
pub mod report;

pub use aggregator::{
    get_area_summary, get_pharmacy_account_summary, get_pharmacy_detailed_statement, DateRange,
    LedgerYearContext,
};
pub use matcher::{resolve_name, resolve_table, ColumnSchema, LedgerTables, TableSchema};
pub use partition::{
    LedgerYear, PartitionHandle, PartitionKind, PartitionSource, SqliteLedgerSource,
};
pub use report::{describe_year, render_report, write_report, YearSchema};
