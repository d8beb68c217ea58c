use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default entry lifetime (one hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// In-memory key/value cache with a fixed time-to-live.
///
/// Guarantees:
/// - `get` returns a value only while `now - inserted_at < ttl`.
/// - Expired entries are evicted lazily by the `get` that observes them;
///   there is no background sweep.
/// - Unexpired entries are never evicted for capacity. The map is unbounded.
///
/// Expiry uses tokio's clock, so paused-time tests can drive it.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a clone of the live value, evicting it first if it has expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(e) => e.inserted_at.elapsed() >= self.ttl,
        };

        if expired {
            entries.remove(key);
            debug!(remaining = entries.len(), "cache entry expired");
            return None;
        }

        entries.get(key).map(|e| e.value.clone())
    }

    /// Inserts or replaces `key`, restarting its lifetime.
    pub fn set(&self, key: K, value: V) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// True if `key` is present and unexpired.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Stored entries, including expired ones not yet observed.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();

        info!(count, "cache cleared");
    }
}
