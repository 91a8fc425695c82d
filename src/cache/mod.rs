//! Reference-Data Cache Module
//!
//! Serves two read-mostly collections to the dashboard:
//! - The client list (one entry)
//! - The SID list of each client (one entry per client name)
//!
//! ## Design
//!
//! Entries live in a [`CacheStore`] as `{timestamp, data}` JSON and are
//! valid for a TTL (24h by default). On a miss, one fetch per key goes to
//! the [`ReferenceSource`]; concurrent callers for the same key join it
//! through a [`SingleFlight`] registry. Fetch failures never surface as
//! `Err`: callers get a [`Lookup`] that tells "no data" from "fetch failed".

mod entry;
mod flight;
mod service;
mod source;
mod stats;
mod store;

pub use entry::{now_millis, CacheEntry};
pub use flight::{Role, SingleFlight};
pub use service::ReferenceCache;
pub use source::{ClientRecord, HttpReferenceSource, ReferenceSource, SidRecord};
pub use stats::CacheStats;
pub use store::{CacheStore, FileStore, MemoryStore, StoreError};

/// Storage key of the client list
pub const CLIENTS_KEY: &str = "sap_dashboard_clients";

/// Prefix of the per-client SID list keys
pub const SID_KEY_PREFIX: &str = "sap_dashboard_sid_";

/// Storage key of one client's SID list
pub fn sid_key(client_name: &str) -> String {
    format!("{SID_KEY_PREFIX}{client_name}")
}

/// Reference fetch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheFetchError {
    /// The request could not be sent or timed out
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Non-2xx answer
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not the expected JSON
    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Any other source failure
    #[error("Reference source error: {0}")]
    Source(String),
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// At least one item, from the cache or a fresh fetch
    Items(Vec<T>),
    /// The source has no items for this key (or the key was blank)
    Empty,
    /// The fetch failed and nothing usable was cached
    Failed(CacheFetchError),
}

impl<T> Lookup<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            Lookup::Empty
        } else {
            Lookup::Items(items)
        }
    }

    /// Items, or an empty list for both `Empty` and `Failed`
    pub fn into_items(self) -> Vec<T> {
        match self {
            Lookup::Items(items) => items,
            Lookup::Empty | Lookup::Failed(_) => Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Lookup::Items(items) => items,
            Lookup::Empty | Lookup::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }

    pub fn error(&self) -> Option<&CacheFetchError> {
        match self {
            Lookup::Failed(e) => Some(e),
            _ => None,
        }
    }
}
