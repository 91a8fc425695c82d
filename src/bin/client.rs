//! `sapdash-ref` Reference Cache CLI
//!
//! Reads SAP clients and SIDs through the persistent reference cache, which
//! fetches from a running `sapdash-server` on a miss.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin sapdash-ref -- clients
//! cargo run --bin sapdash-ref -- sids ACME
//! cargo run --bin sapdash-ref -- clear ACME
//! cargo run --bin sapdash-ref -- --api-url http://10.0.0.5:8080 clear-all
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sapdash::cache::{CacheStore, FileStore, HttpReferenceSource, Lookup, ReferenceCache};
use sapdash::{telemetry, Config};

#[derive(Parser)]
#[clap(version, about = "SAP reference data cache")]
#[clap(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to config.toml + config.local.toml)
    #[clap(long)]
    config: Option<String>,

    /// Base URL of the dashboard API
    #[clap(long)]
    api_url: Option<String>,

    /// Cache file
    #[clap(long)]
    store: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List SAP clients
    Clients,
    /// List the SIDs of one client
    Sids { client_name: String },
    /// Drop the client list, or one client's SID list
    Clear { client_name: Option<String> },
    /// Drop every cached reference list
    ClearAll,
    /// Print cached keys and this run's counters
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {path}"))?,
        None => Config::load().unwrap_or_default(),
    };
    telemetry::init_tracing(&config.logging);

    let api_url = cli.api_url.unwrap_or_else(|| config.cache.api_url.clone());
    let store_path = resolve_store_path(cli.store, &config);

    let store = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("opening cache {}", store_path.display()))?,
    );
    let source = Arc::new(
        HttpReferenceSource::new(&api_url, config.cache.request_timeout())
            .with_context(|| format!("building HTTP client for {api_url}"))?,
    );
    let cache = ReferenceCache::new(store.clone(), source, config.cache.ttl());

    match cli.command {
        Commands::Clients => {
            let lookup = cache.get_clients().await;
            report(&lookup)?;
            for client in lookup.items() {
                println!("{}", client.nomecliente);
            }
        }
        Commands::Sids { client_name } => {
            let lookup = cache.get_sids_for_client(&client_name).await;
            report(&lookup)?;
            for sid in lookup.items() {
                println!("{}\t{}", sid.sid, sid.nomecliente);
            }
        }
        Commands::Clear { client_name } => {
            let removed = cache.clear_client_cache(client_name.as_deref())?;
            let what = client_name
                .map_or_else(|| "client list".to_string(), |c| format!("SIDs of {c}"));
            if removed {
                println!("Cleared {what}");
            } else {
                println!("Nothing cached for {what}");
            }
        }
        Commands::ClearAll => {
            let removed = cache.clear_all_cache()?;
            println!("Cleared {removed} entr{}", if removed == 1 { "y" } else { "ies" });
        }
        Commands::Stats => {
            let keys = store.keys()?;
            println!("Cache file: {}", store.path().display());
            println!("TTL:        {}s", cache.ttl().as_secs());
            println!("Entries:    {}", keys.len());
            for key in keys {
                println!("  {key}");
            }
            let stats = cache.stats();
            println!(
                "Counters:   hits={} misses={} fetches={} failures={} joined={}",
                stats.hits, stats.misses, stats.fetches, stats.failures, stats.joined
            );
        }
    }

    Ok(())
}

/// `--store` wins over `[cache].store_path`
fn resolve_store_path(store: Option<PathBuf>, config: &Config) -> PathBuf {
    store.unwrap_or_else(|| config.cache.store_path.clone())
}

/// A failed fetch is reported on stderr and turned into a non-zero exit.
fn report<T>(lookup: &Lookup<T>) -> anyhow::Result<()> {
    match lookup.error() {
        Some(err) => Err(anyhow::anyhow!("reference fetch failed: {err}")),
        None => Ok(()),
    }
}
