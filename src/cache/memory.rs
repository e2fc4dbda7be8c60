//! In-memory response store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::cache::{CacheStore, Compute};
use crate::http::response::ProxyResponse;
use crate::observability::metrics;

#[derive(Debug)]
struct StoredResponse {
    response: ProxyResponse,
    stored_at: Instant,
}

type Slot = Arc<OnceCell<StoredResponse>>;

/// A thread-safe response cache.
///
/// Each key owns a `OnceCell`; concurrent misses for one key wait on the
/// same initialization, so the backend is asked at most once.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, Slot>>,
    ttl: Option<Duration>,
    last_sweep: Arc<Mutex<Option<Instant>>>,
}

impl MemoryCacheStore {
    /// Create a store whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose entries are recomputed after `ttl`.
    ///
    /// Expired entries are swept from the map at most once per `ttl`, when a
    /// miss inserts a new key.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Number of keys with a live stored response.
    pub fn len(&self) -> usize {
        self.inner
            .iter()
            .filter(|slot| slot.value().initialized() && !self.is_expired(slot.value()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let before = self.inner.len();
        self.inner.retain(|_, slot| !self.is_expired(slot));
        let purged = before.saturating_sub(self.inner.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.inner.len(), "Expired cache entries purged");
        }
        purged
    }

    fn is_expired(&self, slot: &Slot) -> bool {
        match (self.ttl, slot.get()) {
            (Some(ttl), Some(stored)) => stored.stored_at.elapsed() >= ttl,
            _ => false,
        }
    }

    fn sweep_if_due(&self) {
        let Some(ttl) = self.ttl else {
            return;
        };
        let due = match self.last_sweep.lock() {
            Ok(mut last) => {
                let due = last.map_or(true, |at| at.elapsed() >= ttl);
                if due {
                    *last = Some(Instant::now());
                }
                due
            }
            Err(_) => false,
        };
        if due {
            self.purge_expired();
        }
    }

    // Never hold a map guard across an await: callers get an owned slot.
    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.inner.get(key) {
            if !self.is_expired(slot.value()) {
                return slot.value().clone();
            }
        }

        self.sweep_if_due();

        let mut entry = self.inner.entry(key.to_string()).or_default();
        if self.is_expired(entry.value()) {
            *entry.value_mut() = Slot::default();
        }
        entry.value().clone()
    }

    /// Drop `slot` if it is still registered under `key` and holds nothing.
    fn discard(&self, key: &str, slot: &Slot) {
        self.inner
            .remove_if(key, |_, current| Arc::ptr_eq(current, slot) && !current.initialized());
    }
}

impl CacheStore for MemoryCacheStore {
    fn fetch<'a>(&'a self, key: &'a str, compute: Compute<'a>) -> Compute<'a> {
        Box::pin(async move {
            let slot = self.slot(key);
            let mut computed = false;

            let result = slot
                .get_or_try_init(|| {
                    computed = true;
                    async move {
                        compute.await.map(|response| StoredResponse {
                            response,
                            stored_at: Instant::now(),
                        })
                    }
                })
                .await;

            let stored = match result {
                Ok(stored) => stored,
                Err(e) => {
                    self.discard(key, &slot);
                    return Err(e);
                }
            };

            if computed {
                tracing::debug!(key = %key, "Cache miss, response stored");
                metrics::record_cache_lookup("miss");
            } else {
                tracing::debug!(key = %key, "Cache hit");
                metrics::record_cache_lookup("hit");
            }
            Ok(stored.response.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn response(body: &'static str) -> ProxyResponse {
        ProxyResponse::new(200, BTreeMap::new(), body)
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let store = MemoryCacheStore::new();

        let first = store.fetch("k", Box::pin(async { Ok(response("one")) })).await.unwrap();
        let second = store.fetch("k", Box::pin(async { Ok(response("two")) })).await.unwrap();

        assert_eq!(first.body, "one");
        assert_eq!(second.body, "one");
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let store = MemoryCacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                store
                    .fetch(
                        "shared",
                        Box::pin(async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(response("slow"))
                        }),
                    )
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().body, "slow");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_is_retried() {
        let store = MemoryCacheStore::new();

        let err = store
            .fetch("k", Box::pin(async { Err(ProxyError::MissingContentLength) }))
            .await;
        assert!(err.is_err());
        assert!(store.is_empty());
        assert_eq!(store.inner.len(), 0);

        let ok = store.fetch("k", Box::pin(async { Ok(response("ok")) })).await.unwrap();
        assert_eq!(ok.body, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = MemoryCacheStore::with_ttl(Duration::from_secs(60));

        store.fetch("k", Box::pin(async { Ok(response("old")) })).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = store.fetch("k", Box::pin(async { Ok(response("new")) })).await.unwrap();

        assert_eq!(fresh.body, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept() {
        let store = MemoryCacheStore::with_ttl(Duration::from_secs(1));

        for i in 0..50 {
            let key = format!("/search?q={}", i);
            store.fetch(&key, Box::pin(async { Ok(response("hit")) })).await.unwrap();
            let _ = store
                .fetch(
                    &format!("/broken?q={}", i),
                    Box::pin(async { Err(ProxyError::MissingContentLength) }),
                )
                .await;
        }
        assert_eq!(store.inner.len(), 50);
        assert_eq!(store.len(), 50);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(store.len(), 0);

        store.fetch("/fresh", Box::pin(async { Ok(response("new")) })).await.unwrap();
        assert_eq!(store.inner.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::with_ttl(Duration::from_secs(10));
        store.fetch("a", Box::pin(async { Ok(response("a")) })).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        store.fetch("b", Box::pin(async { Ok(response("b")) })).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(MemoryCacheStore::new().purge_expired(), 0);
    }
}
