//! Per-account statements and area roll-ups across a year's partitions.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sea_query::{Alias, Asterisk, Expr, Query, SqliteQueryBuilder};
use serde::Deserialize;
use service_core::error::AppError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::{debug, info, instrument, warn};

use super::matcher::{
    LedgerTables, TableSchema, ACCOUNT_COLUMN_CANDIDATES, AMOUNT_COLUMN_CANDIDATES,
    AREA_COLUMN_CANDIDATES, DATE_COLUMN_CANDIDATES, REFERENCE_COLUMN_CANDIDATES,
};
use super::normalize::{column_value, normalize_amount, normalize_date, row_to_raw, value_to_text};
use super::partition::{LedgerYear, PartitionHandle, PartitionKind, PartitionSource};
use super::reflect::reflect_tables;
use crate::models::{
    sort_events, AreaSummary, EventMeta, EventType, LedgerEvent, LedgerTotals, PharmacyStatement,
    PharmacySummary,
};
use crate::services::metrics::{EVENTS_FETCHED_TOTAL, LEDGER_QUERY_DURATION};

/// Optional inclusive bounds on the event date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        Self { date_from, date_to }
    }
}

/// An opened partition and the roles found in it.
pub struct Partition {
    pub kind: PartitionKind,
    pub tables: LedgerTables,
    conn: SqliteConnection,
}

/// Everything loaded for one year, built once per request.
pub struct LedgerYearContext {
    pub year: LedgerYear,
    pub partitions: Vec<Partition>,
    pub warnings: Vec<String>,
}

impl LedgerYearContext {
    /// Open and reflect each partition of the year. Missing partitions become warnings.
    #[instrument(skip(source))]
    pub async fn load(source: &dyn PartitionSource, year: Option<&str>) -> Result<Self, AppError> {
        let year = LedgerYear::resolve(year, source.default_year())?;
        let mut partitions = Vec::new();
        let mut warnings = Vec::new();

        for kind in PartitionKind::ALL {
            let mut conn = match source.open(&year, kind).await? {
                PartitionHandle::Open(conn) => conn,
                PartitionHandle::Missing(warning) => {
                    warn!(kind = %kind, "{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };

            let tables = LedgerTables::from_tables(&reflect_tables(&mut conn).await?);
            debug!(
                kind = %kind,
                pharmacies = ?tables.pharmacies.as_ref().map(|t| &t.name),
                invoices = ?tables.invoices.as_ref().map(|t| &t.name),
                returns = ?tables.returns.as_ref().map(|t| &t.name),
                receipts_cash = ?tables.receipts_cash.as_ref().map(|t| &t.name),
                receipts_cheque = ?tables.receipts_cheque.as_ref().map(|t| &t.name),
                "Ledger roles resolved"
            );
            partitions.push(Partition { kind, tables, conn });
        }

        Ok(Self {
            year,
            partitions,
            warnings,
        })
    }

    /// Close every partition connection.
    pub async fn close(self) {
        for partition in self.partitions {
            if let Err(e) = partition.conn.close().await {
                warn!(kind = %partition.kind, error = %e, "Failed to close ledger partition");
            }
        }
    }
}

fn date_literal(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Rows of one event table for `legacy_id`, normalised into events.
///
/// Tables without a resolvable account-id or date column contribute nothing.
async fn fetch_events(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    event_type: EventType,
    kind: PartitionKind,
    legacy_id: &str,
    range: &DateRange,
) -> Result<Vec<LedgerEvent>, AppError> {
    let Some(account_col) = table.resolve_column(ACCOUNT_COLUMN_CANDIDATES) else {
        debug!(table = %table.name, "No account column; table skipped");
        return Ok(Vec::new());
    };
    let Some(date_col) = table.resolve_column(DATE_COLUMN_CANDIDATES) else {
        debug!(table = %table.name, "No date column; table skipped");
        return Ok(Vec::new());
    };
    let amount_col = table.resolve_column(AMOUNT_COLUMN_CANDIDATES);
    let reference_col = table.resolve_column(REFERENCE_COLUMN_CANDIDATES);

    // The statement holds `Rc` idents; it must not live across an await.
    let sql = {
        let mut query = Query::select();
        query
            .column(Asterisk)
            .from(Alias::new(&table.name))
            .and_where(Expr::col(Alias::new(account_col)).eq(legacy_id));
        if let Some(from) = range.date_from {
            query.and_where(Expr::col(Alias::new(date_col)).gte(date_literal(from)));
        }
        if let Some(to) = range.date_to {
            query.and_where(Expr::col(Alias::new(date_col)).lte(date_literal(to)));
        }
        query.to_string(SqliteQueryBuilder)
    };

    let timer = LEDGER_QUERY_DURATION
        .with_label_values(&[event_type.as_str()])
        .start_timer();
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    timer.observe_duration();

    let mut events = Vec::with_capacity(rows.len());
    for row in &rows {
        let raw = row_to_raw(row)?;
        let field = |col: Option<&str>| col.and_then(|c| raw.get(c));

        events.push(LedgerEvent {
            event_type,
            date: field(Some(date_col)).and_then(normalize_date),
            amount: field(amount_col).map(normalize_amount).unwrap_or_default(),
            reference: field(reference_col).and_then(value_to_text),
            meta: EventMeta {
                table: table.name.clone(),
                db_kind: kind,
            },
            raw: raw.clone(),
        });
    }

    EVENTS_FETCHED_TOTAL
        .with_label_values(&[event_type.as_str()])
        .inc_by(events.len() as f64);

    Ok(events)
}

/// Merged, sorted events for one account across every open partition.
async fn gather_pharmacy_events(
    ctx: &mut LedgerYearContext,
    legacy_id: &str,
    range: &DateRange,
) -> Result<Vec<LedgerEvent>, AppError> {
    let mut events = Vec::new();
    for partition in ctx.partitions.iter_mut() {
        for event_type in EventType::ALL {
            let Some(table) = partition.tables.event_table(event_type) else {
                continue;
            };
            events.extend(
                fetch_events(
                    &mut partition.conn,
                    table,
                    event_type,
                    partition.kind,
                    legacy_id,
                    range,
                )
                .await?,
            );
        }
    }
    sort_events(&mut events);
    Ok(events)
}

async fn statement_in_context(
    ctx: &mut LedgerYearContext,
    legacy_id: &str,
    range: &DateRange,
) -> Result<PharmacyStatement, AppError> {
    let events = gather_pharmacy_events(ctx, legacy_id, range).await?;
    let summary = LedgerTotals::from_events(&events);

    Ok(PharmacyStatement {
        pharmacy_legacy_id: legacy_id.to_string(),
        year: ctx.year.to_string(),
        events,
        summary,
        warnings: ctx.warnings.clone(),
    })
}

/// Every event for `legacy_id` in the year, with totals.
#[instrument(skip(source))]
pub async fn get_pharmacy_detailed_statement(
    source: &dyn PartitionSource,
    legacy_id: &str,
    range: DateRange,
    year: Option<&str>,
) -> Result<PharmacyStatement, AppError> {
    let mut ctx = LedgerYearContext::load(source, year).await?;
    let result = statement_in_context(&mut ctx, legacy_id, &range).await;
    ctx.close().await;

    let statement = result?;
    info!(
        year = %statement.year,
        events = statement.events.len(),
        warnings = statement.warnings.len(),
        "Pharmacy statement built"
    );
    Ok(statement)
}

/// Totals for `legacy_id`; the detailed statement without its events.
pub async fn get_pharmacy_account_summary(
    source: &dyn PartitionSource,
    legacy_id: &str,
    range: DateRange,
    year: Option<&str>,
) -> Result<PharmacySummary, AppError> {
    get_pharmacy_detailed_statement(source, legacy_id, range, year)
        .await
        .map(PharmacySummary::from)
}

/// Distinct account ids whose area column equals `area_id` in one partition.
async fn find_area_pharmacies(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    area_id: &str,
) -> Result<Vec<String>, AppError> {
    let (Some(area_col), Some(account_col)) = (
        table.resolve_column(AREA_COLUMN_CANDIDATES),
        table.resolve_column(ACCOUNT_COLUMN_CANDIDATES),
    ) else {
        debug!(table = %table.name, "Account table lacks area or account column");
        return Ok(Vec::new());
    };

    let sql = Query::select()
        .distinct()
        .column(Alias::new(account_col))
        .from(Alias::new(&table.name))
        .and_where(Expr::col(Alias::new(area_col)).eq(area_id))
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(id) = value_to_text(&column_value(row, 0)?) {
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn area_summary_in_context(
    ctx: &mut LedgerYearContext,
    area_id: &str,
    range: &DateRange,
) -> Result<AreaSummary, AppError> {
    let mut pharmacy_ids = BTreeSet::new();
    for partition in ctx.partitions.iter_mut() {
        if let Some(table) = partition.tables.pharmacies.as_ref() {
            pharmacy_ids.extend(find_area_pharmacies(&mut partition.conn, table, area_id).await?);
        }
    }

    let mut pharmacies = Vec::with_capacity(pharmacy_ids.len());
    for pharmacy_id in &pharmacy_ids {
        let statement = statement_in_context(ctx, pharmacy_id, range).await?;
        pharmacies.push(PharmacySummary::from(statement));
    }

    let totals = LedgerTotals::sum(pharmacies.iter().map(|p| &p.totals));

    Ok(AreaSummary {
        area_id: area_id.to_string(),
        year: ctx.year.to_string(),
        pharmacies,
        totals,
        warnings: ctx.warnings.clone(),
    })
}

/// Summaries for every account in `area_id`, plus their componentwise total.
#[instrument(skip(source))]
pub async fn get_area_summary(
    source: &dyn PartitionSource,
    area_id: &str,
    range: DateRange,
    year: Option<&str>,
) -> Result<AreaSummary, AppError> {
    let mut ctx = LedgerYearContext::load(source, year).await?;
    let result = area_summary_in_context(&mut ctx, area_id, &range).await;
    ctx.close().await;

    let summary = result?;
    info!(
        year = %summary.year,
        pharmacies = summary.pharmacies.len(),
        "Area summary built"
    );
    Ok(summary)
}
