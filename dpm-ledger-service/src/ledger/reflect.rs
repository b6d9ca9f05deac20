//! Schema reflection for a single SQLite partition.

use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use tracing::{debug, instrument};

use super::matcher::{ColumnSchema, TableSchema};

/// User tables of the connected database with their columns, sorted by table name.
#[instrument(skip(conn))]
pub async fn reflect_tables(conn: &mut SqliteConnection) -> Result<Vec<TableSchema>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT name FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = sqlx::query("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .bind(&name)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|row| -> Result<ColumnSchema, sqlx::Error> {
                Ok(ColumnSchema {
                    name: row.try_get("name")?,
                    data_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(TableSchema { name, columns });
    }

    debug!(table_count = tables.len(), "Partition schema reflected");
    Ok(tables)
}
