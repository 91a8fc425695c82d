//! Reference cache tests: TTL freshness, single-flight, clearing, failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use sapdash::cache::{
    now_millis, sid_key, CacheEntry, CacheFetchError, CacheStore, ClientRecord, FileStore, Lookup,
    MemoryStore, ReferenceCache, ReferenceSource, SidRecord, CLIENTS_KEY,
};
use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(86_400);
const DAY_MS: i64 = 86_400_000;

/// Source that counts calls, optionally delays, and can be switched to fail.
#[derive(Default)]
struct FakeSource {
    client_calls: AtomicUsize,
    sid_calls: AtomicUsize,
    delay: Option<Duration>,
    failure: Mutex<Option<CacheFetchError>>,
}

impl FakeSource {
    fn slow(delay: Duration) -> Self {
        FakeSource {
            delay: Some(delay),
            ..FakeSource::default()
        }
    }

    fn fail_with(&self, error: Option<CacheFetchError>) {
        *self.failure.lock() = error;
    }

    fn client_calls(&self) -> usize {
        self.client_calls.load(Ordering::SeqCst)
    }

    fn sid_calls(&self) -> usize {
        self.sid_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) -> Result<(), CacheFetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReferenceSource for FakeSource {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>, CacheFetchError> {
        self.client_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        Ok(vec![
            ClientRecord {
                nomecliente: "ACME".to_string(),
            },
            ClientRecord {
                nomecliente: "Globex".to_string(),
            },
        ])
    }

    async fn fetch_sids(&self, client_name: &str) -> Result<Vec<SidRecord>, CacheFetchError> {
        self.sid_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        if client_name == "Nobody" {
            return Ok(Vec::new());
        }
        Ok(vec![
            SidRecord {
                sid: "PRD".to_string(),
                nomecliente: client_name.to_string(),
            },
            SidRecord {
                sid: "QAS".to_string(),
                nomecliente: client_name.to_string(),
            },
        ])
    }
}

fn seed_clients(store: &dyn CacheStore, timestamp: i64, names: &[&str]) {
    let data: Vec<ClientRecord> = names
        .iter()
        .map(|n| ClientRecord {
            nomecliente: n.to_string(),
        })
        .collect();
    let json = serde_json::to_string(&CacheEntry::new(timestamp, data)).unwrap();
    store.set(CLIENTS_KEY, json).unwrap();
}

fn stored_timestamp(store: &dyn CacheStore, key: &str) -> i64 {
    let raw = store.get(key).unwrap().expect("entry should exist");
    let entry: CacheEntry<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    entry.timestamp
}

fn setup(source: FakeSource) -> (ReferenceCache, Arc<FakeSource>, Arc<MemoryStore>) {
    let source = Arc::new(source);
    let store = Arc::new(MemoryStore::new());
    let cache = ReferenceCache::new(store.clone(), source.clone(), DAY);
    (cache, source, store)
}

#[tokio::test]
async fn test_stale_entry_is_refetched_with_new_timestamp() {
    let (cache, source, store) = setup(FakeSource::default());
    let stale = now_millis() - DAY_MS - 1;
    seed_clients(store.as_ref(), stale, &["Old Corp"]);

    let lookup = cache.get_clients().await;

    assert_eq!(source.client_calls(), 1);
    assert_eq!(lookup.items().len(), 2);
    assert_eq!(lookup.items()[0].nomecliente, "ACME");
    assert!(stored_timestamp(store.as_ref(), CLIENTS_KEY) > stale);
}

#[tokio::test]
async fn test_fresh_entry_is_served_without_fetch() {
    let (cache, source, store) = setup(FakeSource::default());
    seed_clients(store.as_ref(), now_millis() - 1, &["Cached Corp"]);

    let lookup = cache.get_clients().await;

    assert_eq!(source.client_calls(), 0);
    assert_eq!(
        lookup,
        Lookup::Items(vec![ClientRecord {
            nomecliente: "Cached Corp".to_string()
        }])
    );
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_fetch() {
    let (cache, source, _store) = setup(FakeSource::slow(Duration::from_millis(50)));

    let lookups = join_all((0..8).map(|_| cache.get_sids_for_client("ACME"))).await;

    assert_eq!(source.sid_calls(), 1);
    for lookup in &lookups {
        assert_eq!(lookup.items().len(), 2);
        assert_eq!(lookup.items()[0].sid, "PRD");
    }
    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.joined, 7);
}

#[tokio::test]
async fn test_concurrent_lookups_for_different_clients_do_not_share() {
    let (cache, source, _store) = setup(FakeSource::slow(Duration::from_millis(20)));

    let (acme, globex) = tokio::join!(
        cache.get_sids_for_client("ACME"),
        cache.get_sids_for_client("Globex")
    );

    assert_eq!(source.sid_calls(), 2);
    assert_eq!(acme.items()[0].nomecliente, "ACME");
    assert_eq!(globex.items()[0].nomecliente, "Globex");
}

#[tokio::test]
async fn test_blank_client_name_touches_nothing() {
    let (cache, source, store) = setup(FakeSource::default());

    assert_eq!(cache.get_sids_for_client("").await, Lookup::Empty);
    assert_eq!(cache.get_sids_for_client("   ").await, Lookup::Empty);

    assert_eq!(source.sid_calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_empty_source_answer_is_cached() {
    let (cache, source, _store) = setup(FakeSource::default());

    assert_eq!(cache.get_sids_for_client("Nobody").await, Lookup::Empty);
    assert_eq!(cache.get_sids_for_client("Nobody").await, Lookup::Empty);

    assert_eq!(source.sid_calls(), 1);
}

#[tokio::test]
async fn test_clear_all_removes_every_reference_key() {
    let (cache, _source, store) = setup(FakeSource::default());
    cache.get_clients().await;
    cache.get_sids_for_client("ACME").await;
    cache.get_sids_for_client("Globex").await;
    store.set("unrelated", "{}".to_string()).unwrap();

    let removed = cache.clear_all_cache().unwrap();

    assert_eq!(removed, 3);
    assert_eq!(store.keys().unwrap(), vec!["unrelated".to_string()]);
}

#[tokio::test]
async fn test_clear_client_list_forces_refetch() {
    let (cache, source, store) = setup(FakeSource::default());
    cache.get_clients().await;
    cache.get_sids_for_client("ACME").await;

    assert!(cache.clear_client_cache(None).unwrap());
    assert!(!cache.clear_client_cache(None).unwrap());
    assert!(store.get(&sid_key("ACME")).unwrap().is_some());

    cache.get_clients().await;
    assert_eq!(source.client_calls(), 2);
}

#[tokio::test]
async fn test_failure_is_reported_and_not_cached() {
    let (cache, source, store) = setup(FakeSource::default());
    let error = CacheFetchError::Status {
        url: "http://127.0.0.1:8080/sap/clients".to_string(),
        status: 502,
    };
    source.fail_with(Some(error.clone()));

    let lookup = cache.get_clients().await;
    assert!(lookup.is_failed());
    assert_eq!(lookup.error(), Some(&error));
    assert!(lookup.clone().into_items().is_empty());
    assert!(store.get(CLIENTS_KEY).unwrap().is_none());

    source.fail_with(None);
    let lookup = cache.get_clients().await;
    assert_eq!(lookup.items().len(), 2);
    assert_eq!(source.client_calls(), 2);

    let stats = cache.stats();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.fetches, 2);
}

#[tokio::test]
async fn test_failed_refresh_does_not_erase_stale_entry() {
    let (cache, source, store) = setup(FakeSource::default());
    let stale = now_millis() - DAY_MS - 1;
    seed_clients(store.as_ref(), stale, &["Old Corp"]);
    source.fail_with(Some(CacheFetchError::Source("down".to_string())));

    assert!(cache.get_clients().await.is_failed());
    assert_eq!(stored_timestamp(store.as_ref(), CLIENTS_KEY), stale);
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache").join("reference.json");

    let source = Arc::new(FakeSource::default());
    {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let cache = ReferenceCache::new(store, source.clone(), DAY);
        assert_eq!(cache.get_sids_for_client("ACME").await.items().len(), 2);
    }

    let store = Arc::new(FileStore::open(&path).unwrap());
    let cache = ReferenceCache::new(store.clone(), source.clone(), DAY);
    assert_eq!(cache.get_sids_for_client("ACME").await.items().len(), 2);

    assert_eq!(source.sid_calls(), 1);
    assert_eq!(store.keys().unwrap(), vec![sid_key("ACME")]);
}
