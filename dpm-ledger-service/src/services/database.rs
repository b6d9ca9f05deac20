//! Audit store for dpm-ledger-service.

use crate::models::{AuditTargetType, LedgerAuditLog, NewAuditEntry};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Optional filters for listing audit entries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub target_type: Option<AuditTargetType>,
    pub target_id: Option<String>,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite audit database.
    #[instrument(skip(database_url), fields(service = "dpm-ledger-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to audit database"
        );

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("Audit database pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Audit Operations
    // -------------------------------------------------------------------------

    /// Append one audit entry and return it as stored.
    #[instrument(skip(self, entry), fields(target_type = %entry.target_type, target_id = %entry.target_id))]
    pub async fn insert_audit_entry(&self, entry: &NewAuditEntry) -> Result<LedgerAuditLog, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_audit_entry"])
            .start_timer();

        let row = sqlx::query_as::<_, LedgerAuditLog>(
            r#"
            INSERT INTO ledger_audit_log (created_at, user_id, action, target_type, target_id, meta)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, created_at, user_id, action, target_type, target_id, meta
            "#,
        )
        .bind(Utc::now())
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.target_type.as_str())
        .bind(&entry.target_id)
        .bind(entry.meta.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to write audit entry: {}", e)))?;

        timer.observe_duration();

        info!(audit_id = row.id, user_id = ?row.user_id, action = %row.action, "Audit entry recorded");

        Ok(row)
    }

    /// Newest entries first.
    #[instrument(skip(self))]
    pub async fn list_audit_entries(
        &self,
        filter: &AuditFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerAuditLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_audit_entries"])
            .start_timer();

        let rows = sqlx::query_as::<_, LedgerAuditLog>(
            r#"
            SELECT id, created_at, user_id, action, target_type, target_id, meta
            FROM ledger_audit_log
            WHERE (?1 IS NULL OR target_type = ?1)
              AND (?2 IS NULL OR target_id = ?2)
            ORDER BY id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(filter.target_type.map(|t| t.as_str()))
        .bind(filter.target_id.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list audit entries: {}", e)))?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn count_audit_entries(&self, filter: &AuditFilter) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_audit_entries"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM ledger_audit_log
            WHERE (?1 IS NULL OR target_type = ?1)
              AND (?2 IS NULL OR target_id = ?2)
            "#,
        )
        .bind(filter.target_type.map(|t| t.as_str()))
        .bind(filter.target_id.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count audit entries: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }
}
