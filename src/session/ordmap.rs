//! Insertion-ordered map
//!
//! Catalog views (parameters, conversions, session details) must iterate
//! in the order entries were added, with O(1) lookup by key. Backed by a
//! Vec of entries plus a key-to-slot index.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A map that preserves insertion order of its keys
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    slots: HashMap<K, usize>,
}

// Manual impl: a derived Default would bound K and V on Default
impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

// `slots` is an index over `entries`, so entry equality is map equality
impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Insert a key-value pair
    ///
    /// Replacing an existing key keeps its original position and returns
    /// the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.slots.get(&key) {
            let old = std::mem::replace(&mut self.entries[slot].1, value);
            return Some(old);
        }
        self.slots.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.slots.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slot = *self.slots.get(key)?;
        Some(&mut self.entries[slot].1)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterate values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Iterate values mutably in insertion order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = OrderedMap::new();
        map.insert("charlie", 3);
        map.insert("alpha", 1);
        map.insert("bravo", 2);

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["charlie", "alpha", "bravo"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        let old = map.insert("a", 10);
        assert_eq!(old, Some(1));
        assert_eq!(map.len(), 2);

        let entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, vec![("a", 10), ("b", 2)]);
    }

    #[test]
    fn test_lookup_by_borrowed_key() {
        let mut map: OrderedMap<String, u32> = OrderedMap::new();
        map.insert("Speed:Chassis".to_string(), 7);

        assert_eq!(map.get("Speed:Chassis"), Some(&7));
        assert!(map.contains_key("Speed:Chassis"));
        assert!(map.get("Missing:Chassis").is_none());
    }
}
