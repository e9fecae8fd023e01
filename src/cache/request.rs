//! In-memory cache keyed by request URL, scoped to one unit of work
//!
//! The cache stores either a decoded payload or the terminal failure that a
//! fetch ended with. There are no TTL semantics: an entry is valid for the
//! remainder of the unit of work and the whole cache is dropped with it.
//! Entries must never be shared across concurrent units of work, since
//! payloads were fetched under a request-correlated header.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::fetch::FetchError;

/// What was stored for a URL: a successful payload or a terminal failure.
#[derive(Debug, Clone)]
pub enum CachedFetch {
    /// Decoded JSON payload from a successful fetch
    Payload(Value),
    /// Terminal failure, replayed on subsequent fetches of the same URL
    Failure(FetchError),
}

/// A single cache entry with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload or failure
    pub stored: CachedFetch,
    /// When the entry was inserted
    pub inserted_at: DateTime<Utc>,
}

/// URL-keyed cache owned by one unit of work
///
/// Interior mutability lets the fetch client record entries behind `&self`;
/// the mutex is never contended in practice because a unit of work is a
/// single logical thread of control.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RequestCache {
    /// Creates an empty cache for a new unit of work
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored for a URL, if any
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.lock().get(url).cloned()
    }

    /// Stores a successful payload for a URL
    pub fn store_payload(&self, url: &str, payload: Value) {
        self.insert(url, CachedFetch::Payload(payload));
    }

    /// Stores a terminal failure for a URL
    pub fn store_failure(&self, url: &str, failure: FetchError) {
        self.insert(url, CachedFetch::Failure(failure));
    }

    /// Number of cached URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert(&self, url: &str, stored: CachedFetch) {
        self.lock().insert(
            url.to_string(),
            CacheEntry {
                stored,
                inserted_at: Utc::now(),
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_none_for_missing_url() {
        let cache = RequestCache::new();
        assert!(cache.get("https://api.weather.gov/points/1,2").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_payload_roundtrip() {
        let cache = RequestCache::new();
        let payload = json!({"properties": {"gridId": "OKX"}});

        cache.store_payload("https://api.weather.gov/points/1,2", payload.clone());

        let entry = cache
            .get("https://api.weather.gov/points/1,2")
            .expect("entry should exist");
        match entry.stored {
            CachedFetch::Payload(v) => assert_eq!(v, payload),
            CachedFetch::Failure(_) => panic!("expected payload"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_failure_is_replayable() {
        let cache = RequestCache::new();
        let failure = FetchError::Fatal {
            status: 404,
            url: "https://api.weather.gov/points/1,2".to_string(),
        };

        cache.store_failure("https://api.weather.gov/points/1,2", failure);

        let entry = cache
            .get("https://api.weather.gov/points/1,2")
            .expect("entry should exist");
        match entry.stored {
            CachedFetch::Failure(FetchError::Fatal { status, .. }) => assert_eq!(status, 404),
            _ => panic!("expected fatal failure"),
        }
    }

    #[test]
    fn test_insert_overwrites_previous_entry() {
        let cache = RequestCache::new();
        cache.store_payload("u", json!(1));
        cache.store_payload("u", json!(2));

        let entry = cache.get("u").expect("entry should exist");
        match entry.stored {
            CachedFetch::Payload(v) => assert_eq!(v, json!(2)),
            CachedFetch::Failure(_) => panic!("expected payload"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insertion_time_is_recorded() {
        let cache = RequestCache::new();
        let before = Utc::now();
        cache.store_payload("u", json!(null));
        let after = Utc::now();

        let entry = cache.get("u").expect("entry should exist");
        assert!(entry.inserted_at >= before);
        assert!(entry.inserted_at <= after);
    }
}
