//! Common test utilities for dpm-ledger-service integration tests.
#![allow(dead_code)]

use dpm_ledger_service::config::{
    AuthConfig, DatabaseConfig, LedgerConfig, LedgerServiceConfig,
};
use dpm_ledger_service::ledger::partition::partition_file_name;
use dpm_ledger_service::ledger::{LedgerYear, PartitionKind};
use dpm_ledger_service::startup::Application;
use jsonwebtoken::{encode, EncodingKey, Header};
use service_core::auth::AccessTokenClaims;
use service_core::config::Config as CommonConfig;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "test-secret";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,dpm_ledger_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Create `ledger_{year}_{kind}.sqlite` in `dir` and run `statements` against it.
pub async fn write_partition(dir: &Path, year: &str, kind: PartitionKind, statements: &[&str]) -> PathBuf {
    let year = LedgerYear::parse(year).expect("valid fixture year");
    let path = dir.join(partition_file_name(&year, kind));

    let mut conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .expect("Failed to create fixture partition");
    for sql in statements {
        sqlx::query(sql)
            .execute(&mut conn)
            .await
            .unwrap_or_else(|e| panic!("Fixture statement failed: {sql}: {e}"));
    }
    conn.close().await.expect("Failed to close fixture partition");

    path
}

pub const ACC_2024: &[&str] = &[
    "CREATE TABLE Customers (CustomerID INTEGER, Name TEXT, Area TEXT)",
    "INSERT INTO Customers VALUES (1001, 'Al Noor', 'N1'), (1002, 'Shifa', 'N1'), (1003, 'Dawa', 'S2'), (NULL, 'Orphan', 'N1')",
    "CREATE TABLE Invoices (CustomerID INTEGER, Date TEXT, Net NUMERIC, Number TEXT)",
    "INSERT INTO Invoices VALUES (1001, '2024-01-10', 100, 'INV-1'), (1001, '2024-02-01', 50.50, 'INV-2'), (1002, '2024-01-15', 200, 'INV-3')",
    "CREATE TABLE Returns (CustomerID INTEGER, Date TEXT, Total NUMERIC)",
    "INSERT INTO Returns VALUES (1001, '2024-01-20', 10)",
];

pub const OTHER_2024: &[&str] = &[
    "CREATE TABLE cash_receipts (customer_id INTEGER, doc_date TEXT, amount NUMERIC, doc_no TEXT)",
    "INSERT INTO cash_receipts VALUES (1001, '2024-01-10', 30, 'CR-1'), (1002, '2024-03-01', 50, 'CR-2')",
    // No account column: never contributes.
    "CREATE TABLE cheques (ref TEXT, date TEXT, amount NUMERIC)",
    "INSERT INTO cheques VALUES ('CH-1', '2024-01-11', 999)",
];

/// A ledger directory holding the 2024 `acc` and `other` partitions; `stc` is absent.
pub async fn ledger_fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create ledger dir");
    write_partition(dir.path(), "2024", PartitionKind::Acc, ACC_2024).await;
    write_partition(dir.path(), "2024", PartitionKind::Other, OTHER_2024).await;
    dir
}

/// Test application wrapper.
pub struct TestApp {
    pub address: String,
    pub http_port: u16,
    pub client: reqwest::Client,
    pub ledger_dir: TempDir,
    pub db_dir: TempDir,
}

impl TestApp {
    /// Spawn the service on a random port over the standard fixture.
    pub async fn spawn() -> Self {
        Self::spawn_with_ledger(ledger_fixture().await).await
    }

    pub async fn spawn_with_ledger(ledger_dir: TempDir) -> Self {
        init_tracing();

        let db_dir = tempfile::tempdir().expect("Failed to create audit db dir");
        let config = LedgerServiceConfig {
            common: CommonConfig {
                host: Ipv4Addr::LOCALHOST.into(),
                port: 0,
            },
            service_name: "dpm-ledger-service-test".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: format!("sqlite://{}", db_dir.path().join("audit.db").display()),
                max_connections: 2,
                min_connections: 1,
            },
            ledger: LedgerConfig {
                db_dir: ledger_dir.path().to_path_buf(),
                active_year: LedgerYear::parse("2024").unwrap(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                jwt_algorithm: "HS256".to_string(),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build application");

        let http_port = app.http_port();
        let address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            http_port,
            client,
            ledger_dir,
            db_dir,
        }
    }

    /// GET `path` under the ledger API, optionally with a bearer token.
    pub async fn get_api(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .get(format!("{}/api/admin/dpm-ledger{}", self.address, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// Signed access token for `sub` with `role`.
pub fn token(sub: &str, role: Option<&str>) -> String {
    let claims = AccessTokenClaims {
        sub: sub.to_string(),
        role: role.map(str::to_string),
        exp: Some(chrono::Utc::now().timestamp() + 3600),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}
