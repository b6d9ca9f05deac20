//! Application startup and lifecycle management.

use crate::config::LedgerServiceConfig;
use crate::handlers;
use crate::ledger::{PartitionSource, SqliteLedgerSource};
use crate::middleware::{auth_middleware, request_metrics_middleware};
use crate::services::{init_metrics, Database};
use axum::{middleware, routing::get, Router};
use service_core::auth::JwtVerifier;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Mount point of the ledger API.
pub const API_PREFIX: &str = "/api/admin/dpm-ledger";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: LedgerServiceConfig,
    pub db: Arc<Database>,
    pub ledger: Arc<dyn PartitionSource>,
    pub jwt: Arc<JwtVerifier>,
}

/// Build the HTTP router for `state`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/pharmacies/:legacy_id/summary",
            get(handlers::pharmacy_summary),
        )
        .route(
            "/pharmacies/:legacy_id/statement",
            get(handlers::pharmacy_statement),
        )
        .route("/areas/:area_id/summary", get(handlers::area_summary))
        .route("/schema", get(handlers::ledger_schema))
        .route("/audit", get(handlers::list_audit_entries))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest(API_PREFIX, api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(middleware::from_fn(request_metrics_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with partitions read from the configured directory.
    pub async fn build(config: LedgerServiceConfig) -> Result<Self, AppError> {
        let source = SqliteLedgerSource::new(&config.ledger.db_dir, config.ledger.active_year.clone());
        tracing::info!(
            db_dir = %source.db_dir().display(),
            active_year = %config.ledger.active_year,
            "Ledger partition directory resolved"
        );
        Self::build_with_source(config, Arc::new(source)).await
    }

    /// Build the application over an arbitrary partition source.
    pub async fn build_with_source(
        config: LedgerServiceConfig,
        ledger: Arc<dyn PartitionSource>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to audit database");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let jwt = JwtVerifier::new(&config.auth.jwt_secret, &config.auth.jwt_algorithm)?;

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
            ledger,
            jwt: Arc::new(jwt),
        };

        let http_addr = config.common.bind_addr();
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "DPM ledger service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "dpm-ledger-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await
    }
}
