//! In-process response cache for public GET routes.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use lru::LruCache;

use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Buffered response as produced by a handler.
#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers: headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            body,
        }
    }
}

struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

/// LRU-bounded response store keyed by request path and query.
///
/// Entries older than the TTL are treated as misses and dropped on access.
pub struct ResponseStore {
    entries: RwLock<LruCache<String, Entry>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Build the lookup key for a request target.
    pub fn key(path: &str, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => format!("{path}?{query}"),
            _ => path.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)?;
        if fresh {
            metrics::counter!("quire_response_cache_hit_total").increment(1);
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            entries.pop(key);
            metrics::counter!("quire_response_cache_evict_total", "reason" => "expired")
                .increment(1);
            None
        }
    }

    pub fn put(&self, key: String, response: CachedResponse) {
        let evicted = rw_write(&self.entries, SOURCE, "put").push(
            key.clone(),
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
        if evicted.is_some_and(|(evicted_key, _)| evicted_key != key) {
            metrics::counter!("quire_response_cache_evict_total", "reason" => "capacity")
                .increment(1);
        }
    }

    /// Drop every entry for `path`, whatever its query string.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_path");
        let prefix = format!("{path}?");
        let doomed: Vec<String> = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.as_str() == path || key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        if !doomed.is_empty() {
            metrics::counter!("quire_response_cache_evict_total", "reason" => "invalidated")
                .increment(doomed.len() as u64);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
