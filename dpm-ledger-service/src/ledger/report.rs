//! Schema inspection of partition files, as data and as a markdown report.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sea_query::{Alias, Asterisk, Expr, Func, Query, SqliteQueryBuilder};
use serde::Serialize;
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{info, instrument, warn};

use super::matcher::{ColumnSchema, LedgerTables, TableSchema};
use super::partition::{LedgerYear, PartitionHandle, PartitionKind, PartitionSource};
use super::reflect::reflect_tables;

pub const REPORT_TITLE: &str = "# DPM Ledger Schema Report";

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// `-1` when the table could not be counted.
    pub row_count: i64,
}

/// Real table names chosen for each role, if any.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleNames {
    pub pharmacies: Option<String>,
    pub invoices: Option<String>,
    pub returns: Option<String>,
    pub receipts_cash: Option<String>,
    pub receipts_cheque: Option<String>,
}

impl From<&LedgerTables> for RoleNames {
    fn from(tables: &LedgerTables) -> Self {
        let name = |t: &Option<TableSchema>| t.as_ref().map(|t| t.name.clone());
        Self {
            pharmacies: name(&tables.pharmacies),
            invoices: name(&tables.invoices),
            returns: name(&tables.returns),
            receipts_cash: name(&tables.receipts_cash),
            receipts_cheque: name(&tables.receipts_cheque),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSchema {
    pub kind: PartitionKind,
    pub roles: RoleNames,
    pub tables: Vec<TableReport>,
}

/// Schema of every available partition of one year.
#[derive(Debug, Clone, Serialize)]
pub struct YearSchema {
    pub year: String,
    pub partitions: Vec<PartitionSchema>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

async fn count_rows(conn: &mut SqliteConnection, table: &str) -> i64 {
    let sql = Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Alias::new(table))
        .to_string(SqliteQueryBuilder);

    match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn).await {
        Ok(count) => count,
        Err(e) => {
            warn!(table = %table, error = %e, "Row count failed");
            -1
        }
    }
}

/// Reflect every table on `conn` and count its rows.
pub async fn analyze_connection(conn: &mut SqliteConnection) -> Result<Vec<TableReport>, AppError> {
    let tables = reflect_tables(conn).await?;
    let mut reports = Vec::with_capacity(tables.len());
    for table in tables {
        let row_count = count_rows(conn, &table.name).await;
        reports.push(TableReport {
            name: table.name,
            columns: table.columns,
            row_count,
        });
    }
    Ok(reports)
}

/// Open the file at `path` read-only and analyze it.
#[instrument]
pub async fn analyze_partition(path: &Path) -> Result<Vec<TableReport>, AppError> {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .connect()
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to open {}: {}",
                path.display(),
                e
            ))
        })?;

    let result = analyze_connection(&mut conn).await;
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close partition after analysis");
    }
    result
}

/// Schema and role resolution of each partition of `year`, through `source`.
#[instrument(skip(source))]
pub async fn describe_year(
    source: &dyn PartitionSource,
    year: Option<&str>,
) -> Result<YearSchema, AppError> {
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

        let result = analyze_connection(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!(kind = %kind, error = %e, "Failed to close ledger partition");
        }
        let tables = result?;

        let schemas: Vec<TableSchema> = tables
            .iter()
            .map(|t| TableSchema {
                name: t.name.clone(),
                columns: t.columns.clone(),
            })
            .collect();

        partitions.push(PartitionSchema {
            kind,
            roles: RoleNames::from(&LedgerTables::from_tables(&schemas)),
            tables,
        });
    }

    Ok(YearSchema {
        year: year.to_string(),
        partitions,
        warnings,
    })
}

/// `ledger_<year>_<kind>.sqlite`-shaped file names.
fn is_partition_file(name: &str) -> bool {
    name.strip_prefix("ledger_")
        .and_then(|rest| rest.strip_suffix(".sqlite"))
        .is_some_and(|middle| middle.contains('_'))
}

/// Partition files in `dir`, sorted by name. Creates `dir` if it does not exist.
pub async fn find_partition_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_str().is_some_and(is_partition_file) && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn column_label(column: &ColumnSchema) -> String {
    if column.data_type.is_empty() {
        column.name.clone()
    } else {
        format!("{} ({})", column.name, column.data_type)
    }
}

/// Markdown report covering every partition file in `dir`.
pub async fn render_report(dir: &Path) -> Result<String, AppError> {
    let files = find_partition_files(dir).await?;
    let mut out = format!("{REPORT_TITLE}\n\n");

    if files.is_empty() {
        let _ = writeln!(out, "## No ledger SQLite files found\n");
        let _ = writeln!(out, "Searched in `{}` and found none.", dir.display());
        return Ok(out);
    }

    for file in &files {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "## {file_name}\n");

        let tables = analyze_partition(file).await?;
        if tables.is_empty() {
            let _ = writeln!(out, "_No tables discovered._\n");
            continue;
        }

        for table in &tables {
            let columns = if table.columns.is_empty() {
                "No columns".to_string()
            } else {
                table.columns.iter().map(column_label).collect::<Vec<_>>().join(", ")
            };
            let rows = if table.row_count < 0 {
                "unknown".to_string()
            } else {
                table.row_count.to_string()
            };
            let _ = writeln!(out, "### {}\n", table.name);
            let _ = writeln!(out, "- Columns: {columns}");
            let _ = writeln!(out, "- Approx rows: {rows}\n");
        }
    }

    Ok(out)
}

/// Render the report for `dir` and write it to `output`, creating parent directories.
#[instrument]
pub async fn write_report(dir: &Path, output: &Path) -> Result<PathBuf, AppError> {
    let content = render_report(dir).await?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, content).await?;
    info!(output = %output.display(), "Schema report written");
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_file_names_are_recognised() {
        assert!(is_partition_file("ledger_2024_acc.sqlite"));
        assert!(is_partition_file("ledger_2023_stc.sqlite"));
        assert!(!is_partition_file("ledger_2024.sqlite"));
        assert!(!is_partition_file("ledger_2024_acc.db"));
        assert!(!is_partition_file("audit.sqlite"));
    }

    #[tokio::test]
    async fn empty_directory_reports_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = render_report(dir.path()).await.unwrap();
        assert!(report.starts_with(REPORT_TITLE));
        assert!(report.contains("No ledger SQLite files found"));
    }

    #[tokio::test]
    async fn report_lists_tables_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger_2024_acc.sqlite");
        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query("CREATE TABLE Invoices (CustomerID INTEGER, Date TEXT, Net NUMERIC)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO Invoices VALUES (1, '2024-01-01', 10), (2, '2024-01-02', 20)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();

        let out = dir.path().join("docs").join("report.md");
        write_report(dir.path(), &out).await.unwrap();
        let report = tokio::fs::read_to_string(&out).await.unwrap();

        assert!(report.contains("## ledger_2024_acc.sqlite"));
        assert!(report.contains("### Invoices"));
        assert!(report.contains("- Columns: CustomerID (INTEGER), Date (TEXT), Net (NUMERIC)"));
        assert!(report.contains("- Approx rows: 2"));
    }
}
