//! HTTP API Module
//!
//! Serves the dashboard backend: health, SAP reference lists read through
//! the query client, and agenda task CRUD.

pub mod dto;
pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, put},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::agenda::TaskRepository;
use crate::config::HttpConfig;
use crate::query::QueryClient;

use self::handlers::{admin, agenda, sap};

/// Shared state handed to every handler through an `Extension`.
pub struct AppState {
    pub queries: QueryClient,
    pub tasks: Arc<dyn TaskRepository>,
    /// Table holding one row per (client, SID) pair in the SAP namespace
    pub reference_table: String,
    started: Instant,
}

impl AppState {
    pub fn new(
        queries: QueryClient,
        tasks: Arc<dyn TaskRepository>,
        reference_table: impl Into<String>,
    ) -> Self {
        AppState {
            queries,
            tasks,
            reference_table: reference_table.into(),
            started: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Creates the Axum router
pub fn create_router(state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if !config.cors_origins.is_empty() {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| {
                let parsed = s.parse();
                if parsed.is_err() {
                    warn!(origin = %s, "invalid_cors_origin_ignored");
                }
                parsed.ok()
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if config.cors_allow_all {
        Some(CorsLayer::permissive())
    } else {
        // No CORS layer: same-origin only
        None
    };

    let mut app = Router::new()
        .route("/health", get(admin::health))
        .route("/sap/clients", get(sap::list_clients))
        .route("/sap/sids", get(sap::list_sids))
        .route(
            "/api/agenda/tasks",
            get(agenda::list_tasks).post(agenda::create_task),
        )
        .route(
            "/api/agenda/tasks/:id",
            put(agenda::update_task).delete(agenda::delete_task),
        )
        .layer(Extension(state));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    app
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Listens for SIGINT (ctrl-c) and SIGTERM to trigger graceful shutdown.
pub async fn start_http_server(
    state: Arc<AppState>,
    config: &HttpConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state, config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let socket = tokio::net::TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(%addr, "http_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("http_server_stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_listener_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!(signal = "SIGINT", "shutdown_requested"),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "shutdown_requested"),
                }
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_install_failed");
                ctrl_c.await;
                info!(signal = "SIGINT", "shutdown_requested");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!(signal = "SIGINT", "shutdown_requested");
    }
}
