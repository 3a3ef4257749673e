use core::ops::{Bound, RangeBounds, RangeFull};
use core::sync::atomic::Ordering;

use super::tagged::Unlinking;
use super::{Entry, NodeRef, SkipList};
use crate::level::{Geometric, LevelGenerator};

/// A weakly consistent scan over the entries of a [SkipList](SkipList) whose keys
/// lie within `R`.
///
/// The scan walks level 0 and yields every entry that is live when the scan reaches
/// it, in ascending key order and never the same key twice.
pub struct Range<'a, K, V, G, R> {
    list: &'a SkipList<K, V, G>,
    range: R,
    cursor: Option<NodeRef<'a, K, V>>,
    done: bool,
}

impl<'a, K, V, G, R> Range<'a, K, V, G, R>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
    R: RangeBounds<K>,
{
    pub(crate) fn new(list: &'a SkipList<K, V, G>, range: R) -> Self {
        Range {
            list,
            range,
            cursor: None,
            done: false,
        }
    }

    fn before_start(&self, key: &K) -> bool {
        match self.range.start_bound() {
            Bound::Included(start) => key < start,
            Bound::Excluded(start) => key <= start,
            Bound::Unbounded => false,
        }
    }

    fn past_end(&self, key: &K) -> bool {
        match self.range.end_bound() {
            Bound::Included(end) => key > end,
            Bound::Excluded(end) => key >= end,
            Bound::Unbounded => false,
        }
    }
}

impl<'a, K, V, G, R> Iterator for Range<'a, K, V, G, R>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
    R: RangeBounds<K>,
{
    type Item = Entry<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // The last entry yielded. Only larger keys may follow it, no matter how often
        // the walk has to back up in front of nodes being unlinked.
        let floor = self.cursor.take();

        let mut curr = match &floor {
            Some(cursor) => cursor.clone(),
            None => self.list.seek(self.range.start_bound()),
        };

        loop {
            let next = match NodeRef::from_maybe_tagged(&curr.levels[0]) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(Unlinking) => {
                    // `curr` is on its way out, pick the walk up again in front of it.
                    curr = self.list.find(curr.key(), 0).prev.swap_remove(0);
                    continue;
                }
            };

            let skip = floor.as_ref().map_or(false, |floor| next.key() <= floor.key())
                || self.before_start(next.key());

            if !skip {
                if self.past_end(next.key()) {
                    self.done = true;
                    return None;
                }

                if next.live() {
                    self.cursor = Some(next.clone());
                    return Some(Entry::from(next));
                }
            }

            curr = next;
        }
    }
}

/// Iterates over all entries of a [SkipList](SkipList) in ascending key order.
pub struct Iter<'a, K, V, G = Geometric> {
    inner: Range<'a, K, V, G, RangeFull>,
}

impl<'a, K, V, G> Iter<'a, K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
{
    pub(crate) fn from_list(list: &'a SkipList<K, V, G>) -> Self {
        Self {
            inner: Range::new(list, ..),
        }
    }
}

impl<'a, K, V, G> Iterator for Iter<'a, K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
{
    type Item = Entry<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Drains a [SkipList](SkipList) in ascending key order.
pub struct IntoIter<K, V, G = Geometric> {
    list: SkipList<K, V, G>,
}

impl<K, V, G> IntoIter<K, V, G> {
    pub(crate) fn from_list(list: SkipList<K, V, G>) -> Self {
        IntoIter { list }
    }
}

impl<K, V, G> Iterator for IntoIter<K, V, G> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let head = self.list.head();
        let first = head.levels[0].load_ptr();

        if first.is_null() {
            return None;
        }

        // # Safety
        //
        // We own the list, so nobody else can reach `first`. Being the smallest node,
        // `first` directly follows the head on every level it is part of.
        unsafe {
            let node = &*first;

            for level in 0..node.height() {
                head.levels[level].store_ptr(node.levels[level].load_ptr());
            }

            self.list.state.len.fetch_sub(1, Ordering::Relaxed);

            Some(Box::from_raw(first).into_parts())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<K, V, G> IntoIterator for SkipList<K, V, G> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, G>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::from_list(self)
    }
}

impl<'a, K, V, G> IntoIterator for &'a SkipList<K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
{
    type Item = Entry<'a, K, V>;
    type IntoIter = Iter<'a, K, V, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for SkipList<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut list = Self::new();
        list.extend(iter);

        list
    }
}

impl<K, V, G> Extend<(K, V)> for SkipList<K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert_exclusive(k, v);
        }
    }
}
