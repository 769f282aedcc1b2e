//! Insertion-ordered map with a fixed capacity.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A map that evicts its oldest entries (by first insertion) once `capacity`
/// is exceeded.
///
/// Replacing or reading an existing entry does not refresh its position.
/// Not thread-safe on its own; callers guard it with a lock.
#[derive(Debug)]
pub(crate) struct BoundedMap<K, V> {
    capacity: usize,
    entries: HashMap<K, (u64, V)>,
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K, V> BoundedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    /// `capacity` must be non-zero; callers validate it at construction.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|(_, v)| v)
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get_mut(key).map(|(_, v)| v)
    }

    /// Insert or replace. Returns the entries evicted to make room.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if let Some((_, slot)) = self.entries.get_mut(&key) {
            *slot = value;
            return Vec::new();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(key, (seq, value));
        self.evict_overflow()
    }

    /// Insert `make()` if `key` is absent. Returns the entries evicted to make room.
    ///
    /// The new key is never among the evicted since it is the newest entry.
    pub(crate) fn insert_if_absent(&mut self, key: K, make: impl FnOnce() -> V) -> Vec<(K, V)> {
        if self.entries.contains_key(&key) {
            return Vec::new();
        }
        self.insert(key, make())
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (seq, value) = self.entries.remove(key)?;
        self.order.remove(&seq);
        Some(value)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Entries in insertion order, oldest first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.values().filter_map(move |k| {
            self.entries.get_key_value(k).map(|(k, (_, v))| (k, v))
        })
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().map(|(_, v)| v)
    }

    fn evict_overflow(&mut self) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some((_, value)) = self.entries.remove(&key) {
                evicted.push((key, value));
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut map = BoundedMap::new(2);
        assert!(map.insert("a", 1).is_empty());
        assert!(map.insert("b", 2).is_empty());

        let evicted = map.insert("c", 3);
        assert_eq!(evicted, vec![("a", 1)]);
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("a"));
        assert_eq!(map.get("c"), Some(&3));
    }

    #[test]
    fn replacing_keeps_insertion_position() {
        let mut map = BoundedMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 10);

        let evicted = map.insert("c", 3);
        assert_eq!(evicted, vec![("a", 10)]);
    }

    #[test]
    fn insert_if_absent_does_not_overwrite() {
        let mut map = BoundedMap::new(4);
        map.insert("a", 1);
        map.insert_if_absent("a", || 99);
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn remove_frees_capacity() {
        let mut map = BoundedMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.remove("a"), Some(1));

        assert!(map.insert("c", 3).is_empty());
        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut map = BoundedMap::new(3);
        map.insert("a", 1);
        map.insert("b", 2);
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.capacity(), 3);
    }
}
