use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::entry::{now_millis, CacheEntry};
use super::flight::{Role, SingleFlight};
use super::source::{ClientRecord, ReferenceSource, SidRecord};
use super::stats::CacheStats;
use super::store::{CacheStore, StoreError};
use super::{sid_key, CacheFetchError, Lookup, CLIENTS_KEY, SID_KEY_PREFIX};

type FetchOutcome<T> = Result<Vec<T>, CacheFetchError>;

/// TTL cache for the client list and the per-client SID lists.
///
/// Each instance owns its store, source and in-flight registry; two
/// instances over the same store only share the persisted entries.
pub struct ReferenceCache {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn ReferenceSource>,
    ttl: Duration,
    client_flights: SingleFlight<FetchOutcome<ClientRecord>>,
    sid_flights: SingleFlight<FetchOutcome<SidRecord>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl ReferenceCache {
    pub fn new(store: Arc<dyn CacheStore>, source: Arc<dyn ReferenceSource>, ttl: Duration) -> Self {
        ReferenceCache {
            store,
            source,
            ttl,
            client_flights: SingleFlight::new(),
            sid_flights: SingleFlight::new(),
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The client list, fetched at most once per TTL.
    pub async fn get_clients(&self) -> Lookup<ClientRecord> {
        self.load(CLIENTS_KEY.to_string(), &self.client_flights, |source| async move {
            source.fetch_clients().await
        })
        .await
    }

    /// The SID list of `client_name`. A blank name yields `Empty` without
    /// touching the store or the source.
    pub async fn get_sids_for_client(&self, client_name: &str) -> Lookup<SidRecord> {
        if client_name.trim().is_empty() {
            warn!("sid_lookup_without_client_name");
            return Lookup::Empty;
        }

        let name = client_name.to_string();
        self.load(sid_key(client_name), &self.sid_flights, move |source| async move {
            source.fetch_sids(&name).await
        })
        .await
    }

    /// Drop the client list entry, or only `client_name`'s SID entry.
    pub fn clear_client_cache(&self, client_name: Option<&str>) -> Result<bool, StoreError> {
        let key = match client_name {
            Some(name) => sid_key(name),
            None => CLIENTS_KEY.to_string(),
        };
        let removed = self.store.remove(&key)?;
        debug!(key = %key, removed, "cache_entry_cleared");
        Ok(removed)
    }

    /// Drop the client list and every SID entry. Returns how many keys went.
    pub fn clear_all_cache(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.store.keys()? {
            if (key == CLIENTS_KEY || key.starts_with(SID_KEY_PREFIX)) && self.store.remove(&key)? {
                removed += 1;
            }
        }
        info!(removed, "cache_cleared");
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        self.stats.lock().reset();
    }

    async fn load<T, F, Fut>(
        &self,
        key: String,
        flights: &SingleFlight<FetchOutcome<T>>,
        fetch: F,
    ) -> Lookup<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce(Arc<dyn ReferenceSource>) -> Fut + Send + 'static,
        Fut: Future<Output = FetchOutcome<T>> + Send + 'static,
    {
        if let Some(items) = read_fresh::<T>(self.store.as_ref(), &key, self.ttl) {
            self.stats.lock().hits += 1;
            debug!(key = %key, "cache_hit");
            return Lookup::from_items(items);
        }
        self.stats.lock().misses += 1;

        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let stats = Arc::clone(&self.stats);
        let ttl = self.ttl;
        let flight_key = key.clone();

        let (outcome, role) = flights
            .run(&key, move || async move {
                // A flight that finished just before this one started may
                // already have refreshed the entry.
                if let Some(items) = read_fresh::<T>(store.as_ref(), &flight_key, ttl) {
                    return Ok(items);
                }

                stats.lock().fetches += 1;
                info!(key = %flight_key, "cache_fetch_started");
                let result = fetch(source).await;
                if let Ok(items) = &result {
                    persist(store.as_ref(), &flight_key, items);
                }
                result
            })
            .await;

        if role == Role::Follower {
            self.stats.lock().joined += 1;
        }

        match outcome {
            Ok(items) => Lookup::from_items(items),
            Err(e) => {
                if role == Role::Leader {
                    self.stats.lock().failures += 1;
                    warn!(key = %key, error = %e, "cache_fetch_failed");
                }
                Lookup::Failed(e)
            }
        }
    }
}

fn read_fresh<T: DeserializeOwned>(store: &dyn CacheStore, key: &str, ttl: Duration) -> Option<Vec<T>> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key = %key, error = %e, "cache_read_failed");
            return None;
        }
    };
    match serde_json::from_str::<CacheEntry<Vec<T>>>(&raw) {
        Ok(entry) if entry.is_fresh(now_millis(), ttl) => Some(entry.data),
        Ok(_) => None,
        Err(e) => {
            warn!(key = %key, error = %e, "cache_entry_corrupt");
            None
        }
    }
}

/// Write failures are logged; the fetched data is still returned.
fn persist<T: Serialize>(store: &dyn CacheStore, key: &str, items: &[T]) {
    let entry = CacheEntry::new(now_millis(), items);
    let result = serde_json::to_string(&entry)
        .map_err(StoreError::from)
        .and_then(|json| store.set(key, json));
    if let Err(e) = result {
        warn!(key = %key, error = %e, "cache_write_failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        client_calls: AtomicUsize,
        sid_calls: AtomicUsize,
    }

    #[async_trait]
    impl ReferenceSource for CountingSource {
        async fn fetch_clients(&self) -> Result<Vec<ClientRecord>, CacheFetchError> {
            self.client_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ClientRecord {
                nomecliente: "ACME".to_string(),
            }])
        }

        async fn fetch_sids(&self, client_name: &str) -> Result<Vec<SidRecord>, CacheFetchError> {
            self.sid_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SidRecord {
                sid: "PRD".to_string(),
                nomecliente: client_name.to_string(),
            }])
        }
    }

    fn cache() -> (ReferenceCache, Arc<CountingSource>, Arc<MemoryStore>) {
        let source = Arc::new(CountingSource {
            client_calls: AtomicUsize::new(0),
            sid_calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::new());
        let cache = ReferenceCache::new(store.clone(), source.clone(), Duration::from_secs(86_400));
        (cache, source, store)
    }

    #[tokio::test]
    async fn test_second_lookup_is_a_hit() {
        let (cache, source, _store) = cache();
        assert_eq!(cache.get_clients().await.items().len(), 1);
        assert_eq!(cache.get_clients().await.items().len(), 1);
        assert_eq!(source.client_calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.fetches, 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_refetched() {
        let (cache, source, store) = cache();
        store.set(CLIENTS_KEY, "{broken".to_string()).unwrap();
        assert!(matches!(cache.get_clients().await, Lookup::Items(_)));
        assert_eq!(source.client_calls.load(Ordering::SeqCst), 1);
        let raw = store.get(CLIENTS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"timestamp\""));
    }

    #[tokio::test]
    async fn test_sid_entries_are_keyed_per_client() {
        let (cache, source, store) = cache();
        cache.get_sids_for_client("ACME").await;
        cache.get_sids_for_client("Globex").await;
        cache.get_sids_for_client("ACME").await;
        assert_eq!(source.sid_calls.load(Ordering::SeqCst), 2);
        assert!(store.get("sap_dashboard_sid_ACME").unwrap().is_some());
        assert!(store.get("sap_dashboard_sid_Globex").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_single_client_keeps_others() {
        let (cache, _source, store) = cache();
        cache.get_clients().await;
        cache.get_sids_for_client("ACME").await;
        cache.get_sids_for_client("Globex").await;

        assert!(cache.clear_client_cache(Some("ACME")).unwrap());
        assert!(store.get("sap_dashboard_sid_ACME").unwrap().is_none());
        assert!(store.get("sap_dashboard_sid_Globex").unwrap().is_some());
        assert!(store.get(CLIENTS_KEY).unwrap().is_some());

        assert!(cache.clear_client_cache(None).unwrap());
        assert!(store.get(CLIENTS_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_stats_zeroes_counters() {
        let (cache, _source, _store) = cache();
        cache.get_clients().await;
        cache.get_clients().await;
        assert_eq!(cache.stats().hits, 1);

        cache.reset_stats();
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.fetches, 0);

        cache.get_clients().await;
        assert_eq!(cache.stats().hits, 1);
    }
}
