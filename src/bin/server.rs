//! `sapdash` Server Binary
//!
//! Starts the dashboard HTTP API backed by Athena and the configured agenda
//! repository.
//!
//! ## Usage
//!
//! ```bash
//! # Start server with default settings
//! cargo run --bin sapdash-server
//!
//! # Start with custom address
//! cargo run --bin sapdash-server -- --host 0.0.0.0 --port 9000
//! ```

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use sapdash::agenda::{DynamoTaskRepository, MemoryTaskRepository, TaskRepository};
use sapdash::api::{self, AppState};
use sapdash::config::AgendaBackend;
use sapdash::query::{AthenaQueryService, QueryClient};
use sapdash::{telemetry, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Using default configuration ({e})");
        Config::default()
    });

    telemetry::init_tracing(&config.logging);

    if let Some(host) = get_arg(&args, "--host") {
        config.http.host = host;
    }
    if let Some(port) = get_arg(&args, "--port") {
        config.http.port = port
            .parse()
            .with_context(|| format!("invalid --port value '{port}'"))?;
    }

    if !config.http.enabled {
        tracing::warn!("http_disabled_by_config");
        return Ok(());
    }

    let athena = AthenaQueryService::from_region(&config.athena.region).await;
    let queries = QueryClient::from_config(Arc::new(athena), &config);

    let tasks: Arc<dyn TaskRepository> = match config.agenda.backend {
        AgendaBackend::Memory => Arc::new(MemoryTaskRepository::new()),
        AgendaBackend::DynamoDb => Arc::new(
            DynamoTaskRepository::from_region(
                &config.athena.region,
                &config.agenda.table_name,
                &config.agenda.year_month_index,
            )
            .await,
        ),
    };

    tracing::info!(
        backend = ?config.agenda.backend,
        sap_database = %config.sap.database,
        reference_table = %config.sap.reference_table,
        "server_starting"
    );
    println!(
        "sapdash server listening on http://{}:{}",
        config.http.host, config.http.port
    );

    let state = Arc::new(AppState::new(
        queries,
        tasks,
        config.sap.reference_table.clone(),
    ));
    api::start_http_server(state, &config.http)
        .await
        .map_err(|e| anyhow!(e))?;

    Ok(())
}

fn get_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}
