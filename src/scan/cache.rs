use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{config::CacheConfig, domain::ScanResult};

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ScanResult,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Oldest insertion at the front.
    order: VecDeque<String>,
}

impl CacheInner {
    fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(url)?;
        if let Some(pos) = self.order.iter().position(|key| key == url) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// Bounded URL -> result map with a fixed time-to-live.
///
/// Eviction follows insertion order; reads never refresh an entry.
#[derive(Debug)]
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    capacity: usize,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            ttl: config.ttl,
            capacity: config.capacity.max(1),
        }
    }

    pub fn get(&self, url: &str) -> Option<ScanResult> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(url) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
        };
        if expired {
            inner.remove(url);
            tracing::debug!(target: "cache", url, "expired entry evicted");
            return None;
        }
        inner.entries.get(url).map(|entry| entry.result.clone())
    }

    pub fn put(&self, url: &str, result: ScanResult) {
        let mut inner = self.inner.lock();
        inner.remove(url);
        inner.entries.insert(
            url.to_string(),
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
        inner.order.push_back(url.to_string());

        if inner.entries.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                tracing::debug!(target: "cache", url = %oldest, "capacity reached; oldest entry evicted");
            }
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        let CacheInner { entries, order } = &mut *inner;
        order.retain(|key| entries.contains_key(key));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_for(url: &str) -> ScanResult {
        ScanResult::skipped(url)
    }

    fn cache(capacity: usize) -> ResultCache {
        ResultCache::new(&CacheConfig {
            ttl: Duration::from_secs(15 * 60),
            capacity,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(100);
        cache.put("https://a.test/", result_for("https://a.test/"));

        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert!(cache.get("https://a.test/").is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("https://a.test/").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn inserting_past_capacity_evicts_oldest_inserted() {
        let cache = cache(100);
        for i in 0..100 {
            let url = format!("https://site{i}.test/");
            cache.put(&url, result_for(&url));
        }
        // Reading the oldest entry must not protect it.
        assert!(cache.get("https://site0.test/").is_some());

        cache.put("https://site100.test/", result_for("https://site100.test/"));

        assert_eq!(cache.len(), 100);
        assert!(cache.get("https://site0.test/").is_none());
        assert!(cache.get("https://site1.test/").is_some());
        assert!(cache.get("https://site100.test/").is_some());
    }

    #[tokio::test]
    async fn overwrite_moves_entry_to_newest() {
        let cache = cache(2);
        cache.put("a", result_for("a"));
        cache.put("b", result_for("b"));
        cache.put("a", result_for("a"));
        cache.put("c", result_for("c"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let cache = cache(10);
        cache.put("old", result_for("old"));
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        cache.put("new", result_for("new"));
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
