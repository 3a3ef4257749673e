//! A common interface over ordered in-memory indexes.

use crate::error::Result;
use crate::level::LevelGenerator;
use crate::SkipList;

/// An ordered key-value index that can be shared between threads.
///
/// Lets a storage engine, or a test harness, drive any index implementation through
/// the same calls. Values are handed out as copies since entries of a concurrent
/// index may change right after they are read.
pub trait OrderedIndex<K, V> {
    /// Inserts or replaces the value of `key`, returning the value it replaced.
    fn insert(&self, key: K, val: V) -> Result<Option<V>>;

    /// A copy of the value currently stored under `key`.
    fn get_value(&self, key: &K) -> Option<V>;

    /// Removes `key`, returning the value it held.
    fn remove(&self, key: &K) -> Result<Option<V>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() < 1
    }
}

impl<K, V, G> OrderedIndex<K, V> for SkipList<K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    G: LevelGenerator,
{
    fn insert(&self, key: K, val: V) -> Result<Option<V>> {
        SkipList::insert(self, key, val)
    }

    fn get_value(&self, key: &K) -> Option<V> {
        self.get(key).map(|entry| entry.val().clone())
    }

    fn remove(&self, key: &K) -> Result<Option<V>> {
        SkipList::remove(self, key)
    }

    fn len(&self) -> usize {
        SkipList::len(self)
    }
}
