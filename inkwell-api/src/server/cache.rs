use axum::body::Bytes;
use inkwell_common::util::PositiveDuration;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use tracing::trace;

#[derive(Clone, Debug)]
struct CacheEntry {
    body: Bytes,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: PositiveDuration) -> Self {
        Self {
            ttl: ttl.as_std(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<Bytes> {
        let entries = self.lock();
        let entry = entries.get(key).filter(|entry| entry.expires_at > now)?;

        trace!(key, "Page cache hit");
        Some(entry.body.clone())
    }

    pub fn insert(&self, key: String, body: Bytes) {
        self.insert_at(key, body, Instant::now());
    }

    pub fn insert_at(&self, key: String, body: Bytes, now: Instant) {
        let Some(expires_at) = now.checked_add(self.ttl) else {
            return;
        };

        let mut entries = self.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key, CacheEntry { body, expires_at });
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use crate::server::cache::PageCache;
    use axum::body::Bytes;
    use inkwell_common::util::PositiveDuration;
    use std::time::{Duration, Instant};

    fn cache() -> PageCache {
        PageCache::new(PositiveDuration::from_seconds(20).unwrap())
    }

    #[test]
    fn serves_until_expiry() {
        let cache = cache();
        let start = Instant::now();

        cache.insert_at("/".to_owned(), Bytes::from_static(b"first"), start);

        assert_eq!(
            cache.get_at("/", start + Duration::from_secs(19)),
            Some(Bytes::from_static(b"first"))
        );
        assert_eq!(cache.get_at("/", start + Duration::from_secs(20)), None);
        assert_eq!(cache.get_at("/?page=2", start), None);
    }

    #[test]
    fn insert_replaces_and_purges() {
        let cache = cache();
        let start = Instant::now();

        cache.insert_at("/".to_owned(), Bytes::from_static(b"old"), start);
        cache.insert_at("/?page=2".to_owned(), Bytes::from_static(b"two"), start);

        let later = start + Duration::from_secs(30);
        cache.insert_at("/".to_owned(), Bytes::from_static(b"new"), later);

        assert_eq!(cache.get_at("/", later), Some(Bytes::from_static(b"new")));
        assert_eq!(cache.lock().len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = cache();

        cache.insert("/".to_owned(), Bytes::from_static(b"page"));
        assert!(cache.get("/").is_some());

        cache.clear();
        assert!(cache.get("/").is_none());
    }
}
