use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Expiring key/value store for exchange responses.
///
/// Entries older than the time-to-live are treated as absent, and a zero TTL
/// disables reuse entirely. Lookups take `&self` so the owning source can be
/// shared across scan tasks; entries are overwritten in place, and the key
/// space is bounded by the scanned universe.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
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

    /// Value stored under `key`, unless it has aged past the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (inserted, value) = entries.get(key)?;
        if inserted.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, (Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_returned() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("BTCUSDT".to_string(), 7_u32);
        assert_eq!(cache.get(&"BTCUSDT".to_string()), Some(7));
    }

    #[test]
    fn missing_keys_return_none() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"ETHUSDT".to_string()), None);
    }

    #[test]
    fn zero_ttl_never_serves_a_hit() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("BTCUSDT".to_string(), 7_u32);
        assert_eq!(cache.get(&"BTCUSDT".to_string()), None);
    }

    #[test]
    fn insert_overwrites_the_previous_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("BTCUSDT".to_string(), 7_u32);
        cache.insert("BTCUSDT".to_string(), 9_u32);
        assert_eq!(cache.get(&"BTCUSDT".to_string()), Some(9));
    }
}
