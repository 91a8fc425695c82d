//! # sapdash
//!
//! Backend for the SAP operations dashboard.
//!
//! ## Architecture
//! ```text
//! dashboard UI
//!     ↓ HTTP
//! [api]        → /sap/clients, /sap/sids, /api/agenda/tasks
//!     ↓
//! [query]      → submit → poll (bounded) → fetch → rows keyed by header
//!     ↓
//! Athena
//!
//! [cache]      → 24h reference cache over the api, single-flight per key
//! [agenda]     → task repository (memory or DynamoDB)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sapdash::query::{AthenaQueryService, QueryClient, QueryOptions};
//!
//! let config = sapdash::Config::load()?;
//! let service = AthenaQueryService::from_region(&config.athena.region).await;
//! let client = QueryClient::from_config(std::sync::Arc::new(service), &config);
//!
//! let rows = client
//!     .run_sap_query("SELECT DISTINCT nomecliente FROM sap_systems", &QueryOptions::default())
//!     .await?;
//! for row in rows {
//!     println!("{}", row["nomecliente"]);
//! }
//! ```

pub mod agenda;
pub mod api;
pub mod cache;
pub mod config;
pub mod query;
pub mod telemetry;

pub use cache::{Lookup, ReferenceCache};
pub use config::Config;
pub use query::{QueryClient, QueryError, QueryOptions, ResultRow};
