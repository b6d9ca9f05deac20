//! Yearly partition files and how they are opened.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::ConnectOptions;
use tracing::{debug, instrument};

use crate::services::metrics::PARTITION_OPENS_TOTAL;

/// Physical database category within a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Acc,
    Other,
    Stc,
}

impl PartitionKind {
    /// Load order.
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Acc, PartitionKind::Other, PartitionKind::Stc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acc => "acc",
            Self::Other => "other",
            Self::Stc => "stc",
        }
    }
}

impl std::fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated four-digit fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LedgerYear(String);

impl LedgerYear {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(AppError::BadRequest(anyhow::anyhow!("Invalid ledger year.")))
        }
    }

    /// `explicit` when given (and non-empty), else `default`.
    pub fn resolve(explicit: Option<&str>, default: &LedgerYear) -> Result<Self, AppError> {
        match explicit.filter(|y| !y.is_empty()) {
            Some(year) => Self::parse(year),
            None => Ok(default.clone()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LedgerYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn partition_file_name(year: &LedgerYear, kind: PartitionKind) -> String {
    format!("ledger_{}_{}.sqlite", year, kind)
}

/// Join `file_name` onto `base_dir`, refusing anything that would leave it.
pub fn safe_join(base_dir: &Path, file_name: &str) -> Result<PathBuf, AppError> {
    let relative = Path::new(file_name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || file_name.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid ledger path.")));
    }
    Ok(base_dir.join(relative))
}

/// Make `dir` absolute against the working directory, collapsing `.` and `..`.
pub fn normalize_dir(dir: &Path) -> PathBuf {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Outcome of trying to open one partition.
pub enum PartitionHandle {
    Open(SqliteConnection),
    /// Not available; the string is surfaced to the caller as a warning.
    Missing(String),
}

/// Where partition connections come from.
///
/// The aggregator asks for each `(year, kind)` once per request and owns the
/// returned connection until the request finishes.
#[async_trait]
pub trait PartitionSource: Send + Sync {
    /// Year used when the caller does not name one.
    fn default_year(&self) -> &LedgerYear;

    /// Open one partition. A missing partition is `Ok(Missing)`; anything the
    /// driver rejects is an error.
    async fn open(&self, year: &LedgerYear, kind: PartitionKind) -> Result<PartitionHandle, AppError>;
}

/// Partitions stored as `ledger_{year}_{kind}.sqlite` files in one directory.
#[derive(Debug, Clone)]
pub struct SqliteLedgerSource {
    db_dir: PathBuf,
    default_year: LedgerYear,
}

impl SqliteLedgerSource {
    pub fn new(db_dir: impl AsRef<Path>, default_year: LedgerYear) -> Self {
        Self {
            db_dir: normalize_dir(db_dir.as_ref()),
            default_year,
        }
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    pub fn partition_path(&self, year: &LedgerYear, kind: PartitionKind) -> Result<PathBuf, AppError> {
        safe_join(&self.db_dir, &partition_file_name(year, kind))
    }
}

#[async_trait]
impl PartitionSource for SqliteLedgerSource {
    fn default_year(&self) -> &LedgerYear {
        &self.default_year
    }

    #[instrument(skip(self), fields(year = %year, kind = %kind))]
    async fn open(&self, year: &LedgerYear, kind: PartitionKind) -> Result<PartitionHandle, AppError> {
        let path = self.partition_path(year, kind)?;

        let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
            PARTITION_OPENS_TOTAL
                .with_label_values(&[kind.as_str(), "error"])
                .inc();
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to stat ledger DB {}: {}",
                path.display(),
                e
            ))
        })?;
        if !exists {
            PARTITION_OPENS_TOTAL
                .with_label_values(&[kind.as_str(), "missing"])
                .inc();
            return Ok(PartitionHandle::Missing(format!(
                "Ledger DB not found at {}",
                path.display()
            )));
        }

        let conn = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| {
                PARTITION_OPENS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to open ledger DB {}: {}",
                    path.display(),
                    e
                ))
            })?;

        PARTITION_OPENS_TOTAL
            .with_label_values(&[kind.as_str(), "ok"])
            .inc();
        debug!(path = %path.display(), "Ledger partition opened");

        Ok(PartitionHandle::Open(conn))
    }
}
