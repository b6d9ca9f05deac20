//! Configuration module for dpm-ledger-service.

use crate::ledger::LedgerYear;
use service_core::config as core_config;
use service_core::config::env_or;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LedgerServiceConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub auth: AuthConfig,
}

/// Audit store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Legacy partition files.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub db_dir: PathBuf,
    pub active_year: LedgerYear,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .finish()
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let active_year = env::var("DPM_LEDGER_ACTIVE_YEAR").unwrap_or_else(|_| "2024".to_string());
        let active_year = LedgerYear::parse(active_year.trim()).map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(
                "DPM_LEDGER_ACTIVE_YEAR must be a four-digit year, got '{}'",
                active_year
            ))
        })?;

        Ok(Self {
            db_dir: PathBuf::from(
                env::var("DPM_LEDGER_DB_DIR").unwrap_or_else(|_| "./ledger_sqlite".to_string()),
            ),
            active_year,
        })
    }
}

impl LedgerServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "dpm-ledger-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 1),
            },
            ledger: LedgerConfig::from_env()?,
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("JWT_SECRET is required"))
                })?,
                jwt_algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            },
        })
    }
}
