use farewatch_core::Offer;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_ENTRIES: usize = 500;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    // insertion order, oldest first
    order: VecDeque<String>,
}

/// In-process cache with per-entry expiry. When full, the oldest insertion is evicted.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    default_ttl: Duration,
    max_entries: usize,
}

/// Search results keyed by `Query::cache_key`
pub type ResultCache = TtlCache<Vec<Offer>>;

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { entries: HashMap::new(), order: VecDeque::new() }),
            default_ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => Instant::now() > entry.expires_at,
        };
        if expired {
            debug!(key, "Cache entry expired");
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else {
            while inner.entries.len() >= self.max_entries {
                let Some(oldest) = inner.order.pop_front() else { break };
                inner.entries.remove(&oldest);
                debug!(key = %oldest, "Cache full, evicted oldest entry");
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, Entry { value, expires_at: Instant::now() + ttl });
    }

    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}
