//! Concurrent map with atomic apply-a-function semantics.
//!
//! A single lock serializes every mutation; reads hand back value-typed
//! snapshots so no caller ever aliases into the protected region.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// Symbol-keyed cache shared between the stream decoders and readers.
#[derive(Debug, Default)]
pub struct ConcurrentMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically run `f` against the underlying map. The callback gets a
    /// mutable reference, so joined updates (read one key, write another)
    /// happen under one critical section.
    pub fn apply<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<K, V>) -> R,
    {
        f(&mut self.inner.lock())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn set(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Snapshot of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_a_snapshot() {
        let map: ConcurrentMap<String, i64> = ConcurrentMap::new();
        map.set("BTC-USDT".into(), 7);

        assert!(map.contains(&"BTC-USDT".to_string()));
        assert_eq!(map.get(&"BTC-USDT".to_string()), Some(7));
        assert_eq!(map.get(&"ETH-USDT".to_string()), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn apply_mutates_the_underlying_map() {
        let map: ConcurrentMap<String, Vec<i64>> = ConcurrentMap::new();
        map.apply(|m| m.entry("BTC-USDT".into()).or_default().push(1));
        map.apply(|m| m.entry("BTC-USDT".into()).or_default().push(2));

        assert_eq!(map.get(&"BTC-USDT".to_string()), Some(vec![1, 2]));
    }

    #[test]
    fn apply_returns_values_computed_under_the_lock() {
        let map: ConcurrentMap<String, i64> = ConcurrentMap::new();
        map.set("a".into(), 1);
        map.set("b".into(), 2);

        let total: i64 = map.apply(|m| m.values().sum());
        assert_eq!(total, 3);
    }

    #[test]
    fn snapshots_do_not_alias_the_protected_region() {
        let map: ConcurrentMap<String, Vec<i64>> = ConcurrentMap::new();
        map.set("a".into(), vec![1]);

        let mut snapshot = map.get(&"a".to_string()).unwrap();
        snapshot.push(2);

        assert_eq!(map.get(&"a".to_string()), Some(vec![1]));
    }

    #[test]
    fn concurrent_writers_serialize() {
        use std::sync::Arc;

        let map: Arc<ConcurrentMap<String, i64>> = Arc::new(ConcurrentMap::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = map.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    map.apply(|m| *m.entry("count".into()).or_insert(0) += 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(map.get(&"count".to_string()), Some(8000));
    }
}
