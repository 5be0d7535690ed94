//! TTL response cache
//!
//! Key/value store with lazy expiry on read, a proactive sweep, and
//! single-flight get-or-fetch. The cache is a redundant-call optimization
//! only; it is never a source of truth and nothing in it survives the
//! process.


use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-lifetime TTL cache.
///
/// The entry table sits behind one mutex with short critical sections, which
/// serializes cache traffic process-wide. The in-flight table holds a
/// per-key async lock so concurrent misses on one key run the fetch once and
/// share the stored result instead of stampeding the upstream.
#[derive(Debug)]
pub struct ResponseCache {
    entries: StdMutex<HashMap<String, CacheEntry>>,
    inflight: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Default for ResponseCache {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: StdMutex::new(HashMap::new()),
            inflight: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Look up a value. An expired entry is treated as absent and removed on
    /// the read that discovers it.
    #[inline]
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return None,
        };
        if expired {
            debug!("Cache entry '{key}' expired, removing");
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value with the given time-to-live.
    #[inline]
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
    }

    /// Remove a key. Returns whether an entry was present.
    #[inline]
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    /// Proactively drop every expired entry, independent of access pattern.
    /// Returns the number of entries removed.
    #[inline]
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Swept {removed} expired cache entries");
        }
        removed
    }

    /// Number of live entries, expired or not. Sweep first for an exact
    /// live count.
    #[inline]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `fetch` and store its
    /// result under `ttl`.
    ///
    /// Concurrent misses on the same key serialize on a per-key guard: the
    /// first caller fetches, later callers re-check the cache after the
    /// guard opens and pick up the stored value. A failed fetch stores
    /// nothing, so the next caller retries.
    #[inline]
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let result = {
            let _guard = gate.lock().await;
            if let Some(value) = self.get(key) {
                Ok(value)
            } else {
                debug!("Cache miss for '{key}', fetching");
                match fetch().await {
                    Ok(value) => {
                        self.set(key, value.clone(), ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        // Waiters still queued on the old gate hold their own Arc; dropping
        // the table entry just lets the next miss start a fresh flight. Only
        // the gate's own flight may drop it: a slow waiter must not tear out
        // a newer gate installed after this one finished.
        let mut inflight = self.inflight.lock().await;
        if inflight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &gate))
        {
            inflight.remove(key);
        }

        result
    }
}
