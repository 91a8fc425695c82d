//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (SAPDASH_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [athena]
//! region = "eu-west-1"
//! database = "dashboard"
//! output_location = "s3://dashboard-athena-results/"
//!
//! [sap]
//! database = "sap_operations"
//! reference_table = "sap_systems"
//!
//! [cache]
//! api_url = "https://api.example.com"
//! ttl_secs = 86400
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! SAPDASH_ATHENA__WORKGROUP=analysts
//! SAPDASH_SAP__OUTPUT_LOCATION=s3://sap-results/
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::query::{PollPolicy, QueryTarget};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub athena: AthenaConfig,
    #[serde(default)]
    pub sap: SapConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub agenda: AgendaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Default query namespace and polling behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena and DynamoDB clients
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    /// S3 URI where Athena writes result files
    #[serde(default = "default_output_location")]
    pub output_location: String,

    /// Delay between two status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status polls per execution. 0 = unbounded.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Wall-clock bound on polling in milliseconds. 0 = unbounded.
    #[serde(default = "default_poll_deadline_ms")]
    pub poll_deadline_ms: u64,
}

/// The SAP reporting namespace used by `run_sap_query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SapConfig {
    #[serde(default = "default_sap_database")]
    pub database: String,

    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    #[serde(default = "default_sap_output_location")]
    pub output_location: String,

    /// Table holding one row per (client, SID)
    #[serde(default = "default_reference_table")]
    pub reference_table: String,
}

/// Reference-data cache settings (client side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds (default: 24 hours)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// JSON file backing the persisted entries
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Base URL of the dashboard API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout for reference fetches in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Agenda task storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgendaBackend {
    /// Process-local map, lost on restart
    #[default]
    Memory,
    /// DynamoDB table
    DynamoDb,
}

/// Agenda configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaConfig {
    #[serde(default)]
    pub backend: AgendaBackend,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Global secondary index keyed on `yearMonth`
    #[serde(default = "default_year_month_index")]
    pub year_month_index: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server configuration for the dashboard API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP server bind address
    #[serde(default = "default_http_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Allowed CORS origins (empty = same-origin only, unless cors_allow_all is true)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Explicitly allow all CORS origins (dev mode opt-in)
    #[serde(default)]
    pub cors_allow_all: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_database() -> String {
    "dashboard".to_string()
}
fn default_workgroup() -> String {
    "primary".to_string()
}
fn default_output_location() -> String {
    "s3://sapdash-athena-results/".to_string()
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_max_poll_attempts() -> u32 {
    150
}
fn default_poll_deadline_ms() -> u64 {
    300_000 // 5 minutes
}
fn default_sap_database() -> String {
    "sap_operations".to_string()
}
fn default_sap_output_location() -> String {
    "s3://sapdash-athena-results/sap/".to_string()
}
fn default_reference_table() -> String {
    "sap_systems".to_string()
}
fn default_cache_ttl_secs() -> u64 {
    86_400
} // 24 hours
fn default_store_path() -> PathBuf {
    PathBuf::from("./sapdash-cache.json")
}
fn default_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_table_name() -> String {
    "agenda_tasks".to_string()
}
fn default_year_month_index() -> String {
    "yearMonth-index".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (SAPDASH_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("SAPDASH_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SAPDASH_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            athena: AthenaConfig::default(),
            sap: SapConfig::default(),
            cache: CacheConfig::default(),
            agenda: AgendaConfig::default(),
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl AthenaConfig {
    /// Namespace used by plain `run_query` calls
    pub fn target(&self) -> QueryTarget {
        QueryTarget {
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
            output_location: self.output_location.clone(),
        }
    }

    /// Polling bounds; zero values disable the matching limit
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: (self.max_poll_attempts > 0).then_some(self.max_poll_attempts),
            deadline: (self.poll_deadline_ms > 0)
                .then(|| Duration::from_millis(self.poll_deadline_ms)),
        }
    }
}

impl SapConfig {
    pub fn target(&self) -> QueryTarget {
        QueryTarget {
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
            output_location: self.output_location.clone(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AthenaConfig {
    fn default() -> Self {
        AthenaConfig {
            region: default_region(),
            database: default_database(),
            workgroup: default_workgroup(),
            output_location: default_output_location(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_deadline_ms: default_poll_deadline_ms(),
        }
    }
}

impl Default for SapConfig {
    fn default() -> Self {
        SapConfig {
            database: default_sap_database(),
            workgroup: default_workgroup(),
            output_location: default_sap_output_location(),
            reference_table: default_reference_table(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: default_cache_ttl_secs(),
            store_path: default_store_path(),
            api_url: default_api_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for AgendaConfig {
    fn default() -> Self {
        AgendaConfig {
            backend: AgendaBackend::default(),
            table_name: default_table_name(),
            year_month_index: default_year_month_index(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            enabled: true,
            host: default_http_host(),
            port: default_http_port(),
            cors_origins: Vec::new(),
            cors_allow_all: false,
        }
    }
}
