//! Process-wide TTL result cache with a small LRU-bounded capacity.
//!
//! Entries expire after the configured TTL and are evicted lazily on lookup;
//! capacity pressure evicts the least-recently-used entry. Lookups and
//! inserts never fail. Only successful analyses are cached; identity failures
//! never reach `put`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

use super::domain::AnalysisReport;

struct CacheEntry {
    report: AnalysisReport,
    inserted_at: Instant,
    last_used: Instant,
}

/// Thread-safe key -> report store shared by all concurrent requests.
///
/// The critical sections are plain map operations; the eviction scan is
/// bounded by the configured capacity, which stays small.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl)
    }

    /// Look up a fresh entry. Entries past their TTL are treated as absent
    /// and removed; a hit refreshes recency.
    pub fn get(&self, key: &str) -> Option<AnalysisReport> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let expired = match entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };

        if expired {
            entries.remove(key);
            return None;
        }

        let entry = entries.get_mut(key).expect("entry checked above");
        entry.last_used = Instant::now();
        Some(entry.report.clone())
    }

    /// Insert a report, evicting the least-recently-used entry if the cache
    /// is at capacity.
    pub fn put(&self, key: String, report: AnalysisReport) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let evict = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(stale_key) = evict {
                entries.remove(&stale_key);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                report,
                inserted_at: now,
                last_used: now,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }
}
