use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use rxoffice_core::Entity;

/// Key/value store abstraction for in-process state.
///
/// Every write replaces the whole value for a key; readers never observe a
/// partially updated record.
pub trait RecordStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
    /// Insert or replace; returns the previous value.
    fn upsert(&self, key: K, value: V) -> Option<V>;
    /// Upsert keyed by the value's own id.
    fn put(&self, value: V) -> Option<V>
    where
        K: Clone,
        V: Entity<Id = K>,
    {
        let key = value.id().clone();
        self.upsert(key, value)
    }
    fn remove(&self, key: &K) -> Option<V>;
    fn list(&self) -> Vec<(K, V)>;
    fn clear(&self);
}

impl<K, V, S> RecordStore<K, V> for Arc<S>
where
    S: RecordStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn upsert(&self, key: K, value: V) -> Option<V> {
        (**self).upsert(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        (**self).remove(key)
    }

    fn list(&self) -> Vec<(K, V)> {
        (**self).list()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory store for tests/dev and the browser-side cache.
#[derive(Debug)]
pub struct InMemoryRecordStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryRecordStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRecordStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecordStore<K, V> for InMemoryRecordStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.read().map(|map| map.contains_key(key)).unwrap_or(false)
    }

    fn upsert(&self, key: K, value: V) -> Option<V> {
        let mut map = self.inner.write().ok()?;
        map.insert(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write().ok()?;
        map.remove(key)
    }

    fn list(&self) -> Vec<(K, V)> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_and_returns_previous() {
        let store: InMemoryRecordStore<String, u32> = InMemoryRecordStore::new();
        assert_eq!(store.upsert("a".into(), 1), None);
        assert_eq!(store.upsert("a".into(), 2), Some(1));
        assert_eq!(store.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn remove_is_idempotent() {
        let store: InMemoryRecordStore<String, u32> = InMemoryRecordStore::new();
        store.upsert("a".into(), 1);
        assert_eq!(store.remove(&"a".to_string()), Some(1));
        assert_eq!(store.remove(&"a".to_string()), None);
        assert!(!store.contains(&"a".to_string()));
    }

    #[test]
    fn shared_handle_sees_same_data() {
        let store = Arc::new(InMemoryRecordStore::<String, u32>::new());
        let other = store.clone();
        store.upsert(String::from("k"), 7);
        assert_eq!(other.list(), vec![("k".to_string(), 7)]);
        other.clear();
        assert!(store.list().is_empty());
    }
}
