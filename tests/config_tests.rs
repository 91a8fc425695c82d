//! Config loading and TOML parsing tests.
//!
//! The env override test is `#[ignore]` (it mutates process env and
//! conflicts in parallel). Run it with:
//! `cargo test --test config_tests -- --ignored --test-threads=1`

use sapdash::config::AgendaBackend;
use sapdash::Config;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    let path = path.to_string_lossy().to_string();
    (dir, path)
}

// Default Configuration Tests
#[test]
fn test_config_default_namespaces() {
    let config = Config::default();
    assert_eq!(config.athena.database, "dashboard");
    assert_eq!(config.sap.database, "sap_operations");
    assert_eq!(config.sap.reference_table, "sap_systems");
    assert_eq!(config.athena.workgroup, "primary");
}

#[test]
fn test_config_default_cache() {
    let config = Config::default();
    assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 60 * 60));
    assert_eq!(config.cache.api_url, "http://127.0.0.1:8080");
}

#[test]
fn test_config_default_agenda_backend() {
    let config = Config::default();
    assert_eq!(config.agenda.backend, AgendaBackend::Memory);
}

// File loading
#[test]
fn test_from_file_partial_sections() {
    let (_dir, path) = write_config(
        r#"
[athena]
region = "eu-west-1"
poll_interval_ms = 500
max_poll_attempts = 0

[sap]
reference_table = "sap_landscape"

[agenda]
backend = "dynamodb"
table_name = "tasks_prod"

[http]
port = 9090
cors_origins = ["https://dashboard.example.com"]
"#,
    );

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.athena.region, "eu-west-1");
    assert_eq!(config.athena.database, "dashboard");
    let policy = config.athena.poll_policy();
    assert_eq!(policy.interval, Duration::from_millis(500));
    assert_eq!(policy.max_attempts, None);
    assert_eq!(policy.deadline, Some(Duration::from_secs(300)));

    assert_eq!(config.sap.reference_table, "sap_landscape");
    assert_eq!(config.sap.database, "sap_operations");

    assert_eq!(config.agenda.backend, AgendaBackend::DynamoDb);
    assert_eq!(config.agenda.table_name, "tasks_prod");
    assert_eq!(config.agenda.year_month_index, "yearMonth-index");

    assert_eq!(config.http.port, 9090);
    assert_eq!(config.http.host, "127.0.0.1");
    assert_eq!(config.http.cors_origins.len(), 1);
}

#[test]
fn test_from_file_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let config = Config::from_file(&path.to_string_lossy()).unwrap();
    assert_eq!(config.http.port, 8080);
}

#[test]
fn test_from_file_rejects_wrong_types() {
    let (_dir, path) = write_config(
        r#"
[http]
port = "not a port"
"#,
    );
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_from_file_rejects_unknown_backend() {
    let (_dir, path) = write_config(
        r#"
[agenda]
backend = "postgres"
"#,
    );
    assert!(Config::from_file(&path).is_err());
}

#[test]
#[ignore]
fn test_env_overrides_file() {
    let (_dir, path) = write_config(
        r#"
[cache]
ttl_secs = 60
"#,
    );
    env::set_var("SAPDASH_CACHE__TTL_SECS", "120");
    env::set_var("SAPDASH_SAP__DATABASE", "sap_staging");

    let config = Config::from_file(&path).unwrap();

    env::remove_var("SAPDASH_CACHE__TTL_SECS");
    env::remove_var("SAPDASH_SAP__DATABASE");

    assert_eq!(config.cache.ttl_secs, 120);
    assert_eq!(config.sap.database, "sap_staging");
}
