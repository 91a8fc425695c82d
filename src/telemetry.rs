//! Tracing setup shared by the binaries.
//!
//! Tracing is off unless `SAPDASH_TRACE` is set to something other than `0`.
//! Events go to a non-blocking file writer (`SAPDASH_TRACE_FILE`, default
//! `sapdash_trace.log`). Level and format come from `[logging]` unless
//! `SAPDASH_TRACE_LEVEL` / `SAPDASH_TRACE_JSON` override them.

use std::env;
use std::sync::OnceLock;

use crate::config::LoggingConfig;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const DEFAULT_TRACE_FILE: &str = "sapdash_trace.log";

/// Resolved tracing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSettings {
    pub enabled: bool,
    pub log_path: String,
    pub level: String,
    pub json: bool,
}

impl TraceSettings {
    /// Resolve settings from a variable lookup, falling back to `[logging]`.
    pub fn resolve(
        logging_config: &LoggingConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let enabled = var("SAPDASH_TRACE").is_some_and(|v| v != "0");
        let log_path = var("SAPDASH_TRACE_FILE").unwrap_or_else(|| DEFAULT_TRACE_FILE.to_string());
        let json = var("SAPDASH_TRACE_JSON")
            .map_or_else(|| logging_config.format == "json", |v| v != "0");
        let level = var("SAPDASH_TRACE_LEVEL").unwrap_or_else(|| logging_config.level.clone());

        TraceSettings {
            enabled,
            log_path,
            level,
            json,
        }
    }

    pub fn from_env(logging_config: &LoggingConfig) -> Self {
        Self::resolve(logging_config, |name| env::var(name).ok())
    }
}

/// Install the global subscriber. Returns `false` when tracing stays off.
pub fn init_tracing(logging_config: &LoggingConfig) -> bool {
    let settings = TraceSettings::from_env(logging_config);
    if !settings.enabled {
        return false;
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "ERROR: Unable to open SAPDASH_TRACE_FILE '{}': {e}",
                settings.log_path
            );
            return false;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = TRACE_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_new(&settings.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_thread_names(true)
            .with_writer(non_blocking.clone())
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if settings.json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
