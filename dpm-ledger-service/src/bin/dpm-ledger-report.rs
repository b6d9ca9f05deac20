//! Writes the markdown schema report for every partition file in `DPM_LEDGER_DB_DIR`.
//!
//! Usage: `dpm-ledger-report [OUTPUT]` (default `docs/dpm_ledger_schema_report.md`).

use dpm_ledger_service::config::LedgerConfig;
use dpm_ledger_service::ledger::partition::normalize_dir;
use dpm_ledger_service::ledger::write_report;
use service_core::observability::init_tracing;
use std::path::PathBuf;

const DEFAULT_OUTPUT: &str = "docs/dpm_ledger_schema_report.md";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing("dpm-ledger-report", &log_level, None);

    let ledger = LedgerConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let dir = normalize_dir(&ledger.db_dir);
    let written = write_report(&dir, &output).await.map_err(|e| {
        tracing::error!(error = %e, dir = %dir.display(), "Failed to write schema report");
        std::io::Error::other(format!("Report error: {}", e))
    })?;

    println!("{}", written.display());
    Ok(())
}
