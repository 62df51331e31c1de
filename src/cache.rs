//! Short-lived memoization of catalog GETs.
//!
//! Browsing the catalog re-requests the same folder and service descriptions
//! on every navigation step, so successful `f=json` responses are kept for a
//! few minutes. Entries are keyed by the literal URL string. Concurrent
//! misses on one URL wait for a single upstream request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::arcgis::JsonFetcher;
use crate::error::CatalogError;

/// Default TTL for cached responses (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<Value> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

pub struct FetchCache<F: JsonFetcher> {
    fetcher: F,
    entries: RwLock<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl<F: JsonFetcher> FetchCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_ttl(fetcher, DEFAULT_TTL)
    }

    pub fn with_ttl(fetcher: F, ttl: Duration) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// GET `url` with `f=json`, reusing a response obtained less than one TTL ago.
    pub fn fetch(&self, url: &str) -> Result<Value, CatalogError> {
        if let Some(value) = self.cached(url) {
            debug!(url, "cache.hit");
            return Ok(value);
        }

        let slot = self.inflight_slot(url);
        let result = {
            let _guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // another caller may have filled the entry while we waited
            match self.cached(url) {
                Some(value) => {
                    debug!(url, "cache.hit");
                    Ok(value)
                }
                None => self.fetch_and_store(url),
            }
        };
        if let Ok(mut inflight) = self.inflight.lock() {
            drop(slot);
            // only the map's handle left: nobody else is waiting on this url
            if inflight.get(url).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                inflight.remove(url);
            }
        }
        result
    }

    /// Uncached GET for one-shot requests such as feature pages.
    pub fn query(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, CatalogError> {
        self.fetcher.get_json(url, params)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn fetch_and_store(&self, url: &str) -> Result<Value, CatalogError> {
        let value = self.fetcher.get_json(url, &[("f", "json")])?;
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
            entries.insert(url.to_string(), CacheEntry::new(value.clone(), self.ttl));
        }
        Ok(value)
    }

    fn inflight_slot(&self, url: &str) -> Arc<Mutex<()>> {
        match self.inflight.lock() {
            Ok(mut inflight) => inflight.entry(url.to_string()).or_default().clone(),
            Err(_) => Arc::default(),
        }
    }

    fn cached(&self, url: &str) -> Option<Value> {
        self.entries.read().ok()?.get(url).and_then(CacheEntry::get)
    }
}
