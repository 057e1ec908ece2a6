use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

/// Insertion-ordered association container.
///
/// Entries iterate in the order their keys were first seen; lookups go
/// through a hash index into the entry vector.
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

/// Equal when the same pairs appear in the same order
impl<K: PartialEq, V: PartialEq> PartialEq for OrderedGroups<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> OrderedGroups<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to the value for `key`, inserting `init()` on first sight
    pub fn entry_or_insert_with(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.index.insert(key.clone(), position);
                self.entries.push((key, init()));
                position
            }
        };
        &mut self.entries[position].1
    }

    /// Insert or replace the value for `key`, returning the previous one.
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn into_vec(self) -> Vec<(K, V)> {
        self.entries
    }

    /// Map values, keeping key order
    pub fn map_values<W>(self, mut f: impl FnMut(&K, V) -> W) -> OrderedGroups<K, W> {
        let entries = self
            .entries
            .into_iter()
            .map(|(k, v)| {
                let w = f(&k, v);
                (k, w)
            })
            .collect();
        OrderedGroups {
            entries,
            index: self.index,
        }
    }
}

impl<K, V> OrderedGroups<K, Vec<V>>
where
    K: Eq + Hash + Clone,
{
    /// Stable grouping of `items` by `key_fn`; items without a key are skipped
    pub fn group_by<I, F>(items: I, mut key_fn: F) -> Self
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> Option<K>,
    {
        let mut groups = Self::new();
        for item in items {
            if let Some(key) = key_fn(&item) {
                groups.entry_or_insert_with(key, Vec::new).push(item);
            }
        }
        groups
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedGroups<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Later duplicates overwrite the value but keep the first position
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut groups = Self::new();
        for (k, v) in iter {
            groups.insert(k, v);
        }
        groups
    }
}

impl<K, V> Serialize for OrderedGroups<K, V>
where
    K: Serialize,
    V: Serialize,
{
    /// Serialized as a list of `[key, value]` pairs to keep the order
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}
