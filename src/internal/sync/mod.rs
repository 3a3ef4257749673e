use core::fmt::Debug;
use core::marker::PhantomData;
use core::ops::{Bound, RangeBounds};
use core::ptr::NonNull;
use core::sync::atomic::{fence, Ordering};

use haphazard::HazardPointer;
use parking_lot::MutexGuard;

use crate::{
    config::Config,
    error::{Error, Result},
    internal::utils::{Can, ListState, Node, Padded},
    level::{Geometric, LevelGenerator},
};

pub(crate) mod tagged;
pub mod iter;

#[cfg(test)]
mod linearizability;

use self::iter::{Iter, Range};
use self::tagged::{Unlinking, UNLINKING};

/// A concurrent, ordered map built on a skip list.
///
/// Readers ([get](SkipList::get), [range](SkipList::range) and friends) never take a
/// lock. Writers lock only the predecessors they splice, validate that those still
/// point where the search saw them pointing, and search again if they do not.
/// Removed nodes are tombstoned first and unlinked afterwards; their memory is
/// reclaimed through hazard pointers once no reader can still be standing on them.
pub struct SkipList<K, V, G = Geometric> {
    pub(crate) head: NonNull<Node<K, V>>,
    pub(crate) state: Padded<ListState>,
    pub(crate) garbage: Can,
    config: Config,
    generator: G,
}

impl<K, V> SkipList<K, V> {
    /// Instantiates a new, empty [SkipList](SkipList) with the default [Config].
    pub fn new() -> Self {
        let config = Config::default();
        let generator = Geometric::new(config.max_level, config.level_probability);

        Self::from_parts(config, generator)
    }

    /// Instantiates a new, empty [SkipList](SkipList) after validating `config`.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        if config != Config::default() {
            tracing::debug!(
                max_level = config.max_level,
                level_probability = config.level_probability,
                retry_budget = config.retry_budget,
                "creating skip list with custom config"
            );
        }

        let generator = Geometric::new(config.max_level, config.level_probability);

        Ok(Self::from_parts(config, generator))
    }
}

impl<K, V, G> SkipList<K, V, G>
where
    G: LevelGenerator,
{
    /// Instantiates a new, empty [SkipList](SkipList) drawing node levels from
    /// `generator` instead of the default geometric coin flips.
    pub fn with_generator(config: Config, generator: G) -> Result<Self> {
        config.validate()?;

        if generator.max_level() > config.max_level {
            return Err(Error::InvalidMaxLevel {
                max_level: generator.max_level(),
                limit: config.max_level,
            });
        }

        Ok(Self::from_parts(config, generator))
    }

    fn gen_height(&self) -> usize {
        let height = self.generator.next_level();

        assert!(
            height >= 1 && height <= self.config.max_level,
            "level generator produced {} outside of 1..={}",
            height,
            self.config.max_level
        );

        height
    }
}

impl<K, V, G> SkipList<K, V, G> {
    fn from_parts(config: Config, generator: G) -> Self {
        SkipList {
            head: Node::head(config.max_level),
            state: Padded::new(ListState::new()),
            garbage: Can::new(),
            config,
            generator,
        }
    }

    /// Gets the number of live entries. Only approximate while writers are active.
    pub fn len(&self) -> usize {
        self.state.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() < 1
    }

    /// The highest level currently holding an entry, or 1 for an empty list.
    pub fn current_level(&self) -> usize {
        self.state.current_level.load(Ordering::Acquire)
    }

    pub fn max_level(&self) -> usize {
        self.config.max_level
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn head(&self) -> &Node<K, V> {
        // # Safety
        //
        // The head lives as long as the list.
        unsafe { self.head.as_ref() }
    }

    fn head_ref(&self) -> NodeRef<'_, K, V> {
        // The head is never retired, so it needs no protection.
        unsafe { NodeRef::protected(self.head, None) }
    }

    /// The highest level whose head link is populated.
    fn highest_lane(&self) -> usize {
        let head = self.head();

        (1..self.config.max_level)
            .rev()
            .find(|&level| !head.levels[level].load_ptr().is_null())
            .map_or(1, |level| level + 1)
    }

    fn raise_level(&self, height: usize) {
        let prev = self
            .state
            .current_level
            .fetch_max(height, Ordering::AcqRel);

        if height > prev {
            tracing::trace!(from = prev, to = height, "raised current level");
        }
    }

    /// Brings the current level in line with the highest populated lane after a
    /// remove. Racing inserts may populate higher lanes at any time, so this settles
    /// only once a scan agrees with the value it replaced.
    fn lower_level(&self) {
        loop {
            let current = self.state.current_level.load(Ordering::Acquire);
            let top = self.highest_lane();

            if top == current {
                return;
            }

            if top > current {
                self.raise_level(top);
                return;
            }

            if self
                .state
                .current_level
                .compare_exchange(current, top, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                tracing::trace!(from = current, to = top, "lowered current level");
            }
        }
    }
}

impl<K, V, G> SkipList<K, V, G>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    G: LevelGenerator,
{
    /// Inserts `val` under `key`, returning the value it replaced.
    ///
    /// An existing entry is updated in place. The replaced value is handed back as a
    /// copy, since lock-free readers may still be looking at the original.
    pub fn insert(&self, key: K, val: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        self.internal_insert(key, val, |node, val| unsafe { self.replace_val(node, val) })
    }

    /// Inserts `val` under `key` only if no live entry exists.
    ///
    /// Returns `true` if the entry was inserted.
    pub fn insert_if_absent(&self, key: K, val: V) -> Result<bool> {
        self.internal_insert(key, val, |_, _| ())
            .map(|present| present.is_none())
    }

    /// Swaps `val` into `node` and retires the previous value slot.
    ///
    /// # Safety
    ///
    /// 1. The caller holds the lock of `node`, and `node` is not removed.
    unsafe fn replace_val(&self, node: &Node<K, V>, val: V) -> V
    where
        V: Clone,
    {
        let old = node.swap_val(val);
        let copy = (*old).clone();

        self.garbage.retire_val(old);

        copy
    }

    /// Searches for `key`, and either hands a live node holding it to `on_present`
    /// under the node's lock, or links a new node carrying `key` and `val`.
    ///
    /// `Ok(None)` means a new node was linked.
    fn internal_insert<R>(
        &self,
        key: K,
        val: V,
        on_present: impl FnOnce(&Node<K, V>, V) -> R,
    ) -> Result<Option<R>> {
        // The level is drawn lazily, updates of an existing entry never need one.
        let mut height = 0;
        let mut attempts = 0;

        loop {
            let search = self.find(&key, height);

            if let Some(target) = search.target() {
                if !target.removed() {
                    // Whoever links `target` is about to finish, only then is it visible.
                    while !target.fully_linked() {
                        core::hint::spin_loop();
                    }

                    let _guard = target.lock();

                    if !target.removed() {
                        return Ok(Some(on_present(&**target, val)));
                    }
                }

                // A tombstoned node with our key is still linked. Its remover never gives
                // up once the tombstone is set, so wait for the unlink to finish.
                std::thread::yield_now();
                continue;
            }

            if height == 0 {
                height = self.gen_height();
            }

            if search.prev.len() < height {
                // The search did not cover every level of the new tower.
                continue;
            }

            let (guards, valid) = Self::lock_prev(&search, height, |level, prev| {
                let next = &search.next[level];

                !prev.removed()
                    && next.as_ref().map_or(true, |next| !next.removed())
                    && core::ptr::eq(prev.levels[level].load_ptr(), NodeRef::ptr_of(next))
            });

            if !valid {
                drop(guards);
                attempts += 1;

                if attempts >= self.config.retry_budget {
                    tracing::warn!(attempts, "insert gave up under contention");
                    return Err(Error::Contention { attempts });
                }

                tracing::trace!(attempts, "insert validation failed, searching again");
                continue;
            }

            let new_node = Node::new(key, val, height);

            // # Safety
            //
            // Nobody else can see `new_node` until it is linked below, and nobody can
            // retire it before it is fully linked.
            let new = unsafe { &*new_node };

            for level in 0..height {
                let prev = &search.prev[level];
                let next = &search.next[level];

                assert!(
                    prev.is_head() || prev.key() < new.key(),
                    "predecessor out of order on level {}",
                    level
                );
                assert!(
                    next.as_ref().map_or(true, |next| next.key() > new.key()),
                    "successor out of order on level {}",
                    level
                );

                new.levels[level].store_ptr(NodeRef::ptr_of(next));
                prev.levels[level].store_ptr(new_node);
            }

            self.raise_level(height);
            self.state.len.fetch_add(1, Ordering::AcqRel);
            new.set_fully_linked();

            drop(guards);

            return Ok(None);
        }
    }

    /// Locks the distinct predecessors on levels `0..height`, lowest level first, and
    /// checks `validate` for every level while holding the locks. Stops at the first
    /// level that fails.
    ///
    /// Predecessors get closer to the searched key the lower the level, so locks are
    /// always taken in descending key order.
    fn lock_prev<'s>(
        search: &'s SearchResult<'_, K, V>,
        height: usize,
        mut validate: impl FnMut(usize, &Node<K, V>) -> bool,
    ) -> (Vec<MutexGuard<'s, ()>>, bool) {
        let mut guards = Vec::with_capacity(height);
        let mut last_locked: *const Node<K, V> = core::ptr::null();

        for level in 0..height {
            let prev = &search.prev[level];

            if !core::ptr::eq(prev.as_ptr(), last_locked) {
                guards.push(prev.lock());
                last_locked = prev.as_ptr();
            }

            if !validate(level, &**prev) {
                return (guards, false);
            }
        }

        (guards, true)
    }

    /// Removes `key`, returning the value it held.
    pub fn remove(&self, key: &K) -> Result<Option<V>>
    where
        V: Clone,
    {
        // # Safety
        //
        // The value slot of a removed node is never swapped again, and the node itself
        // is protected by the remover.
        self.internal_remove(key, |node| unsafe { (*node.load_val()).clone() })
    }

    /// Finds a live node for `key`, locks it and its predecessors, validates them and
    /// then tombstones and unlinks the node. `take` extracts the result from the node
    /// right after the tombstone is set.
    ///
    /// Once the tombstone is set the operation runs to completion.
    fn internal_remove<R>(
        &self,
        key: &K,
        take: impl FnOnce(&Node<K, V>) -> R,
    ) -> Result<Option<R>> {
        let mut height_hint = 0;
        let mut attempts = 0;

        loop {
            let search = self.find(key, height_hint);

            let (level, victim) = match search.found.zip(search.target()) {
                Some(found) => found,
                None => return Ok(None),
            };

            // A node that is still being linked is not in the map yet, and a tombstoned
            // one is already gone.
            if !victim.live() {
                return Ok(None);
            }

            let height = victim.height();

            // A live node is linked on all of its levels, the search just did not
            // start high enough to see all of them.
            if search.prev.len() < height || level + 1 != height {
                height_hint = height;
                continue;
            }

            let victim_guard = victim.lock();

            if victim.removed() {
                return Ok(None);
            }

            let (guards, valid) = Self::lock_prev(&search, height, |level, prev| {
                !prev.removed() && core::ptr::eq(prev.levels[level].load_ptr(), victim.as_ptr())
            });

            if !valid {
                drop(guards);
                drop(victim_guard);
                attempts += 1;

                if attempts >= self.config.retry_budget {
                    tracing::warn!(attempts, "remove gave up under contention");
                    return Err(Error::Contention { attempts });
                }

                tracing::trace!(attempts, "remove validation failed, searching again");
                continue;
            }

            let tombstoned = victim.set_removed();
            assert!(
                tombstoned.is_ok(),
                "tombstone set while holding the node lock"
            );

            let taken = take(&**victim);

            // Unlink top down. Every outgoing link is tagged before the node is bypassed,
            // so readers standing on the victim stop trusting it as a pass-through.
            for level in (0..height).rev() {
                let next = victim.levels[level].load_ptr();

                victim.levels[level].tag(UNLINKING);
                search.prev[level].levels[level].store_ptr(next);
            }

            drop(guards);
            drop(victim_guard);

            self.state.len.fetch_sub(1, Ordering::AcqRel);

            // # Safety
            //
            // The victim is unlinked from every level and was tombstoned by us alone.
            unsafe { self.garbage.retire_node(victim.as_ptr()) };

            self.lower_level();

            return Ok(Some(taken));
        }
    }

    /// Removes the smallest entry.
    pub fn pop_front(&self) -> Result<Option<(K, V)>>
    where
        K: Clone,
        V: Clone,
    {
        loop {
            let key = match self.front() {
                Some(first) => first.key().clone(),
                None => return Ok(None),
            };

            // Losing the race against another remover just means trying the next one.
            if let Some(val) = self.remove(&key)? {
                return Ok(Some((key, val)));
            }
        }
    }

    /// Walks down from the current level recording, on every level, the last node
    /// before `key` and the node right after it.
    ///
    /// The search covers at least `height` levels, so an insert of that height finds
    /// all of its predecessors. Tombstoned nodes are walked through like any other; a
    /// node that is being unlinked on the level we are about to leave it by sends the
    /// search back to the head.
    fn find<'a>(&'a self, key: &K, height: usize) -> SearchResult<'a, K, V> {
        'search: loop {
            let top = self
                .current_level()
                .max(height)
                .min(self.config.max_level);

            let mut prev = Vec::with_capacity(top);
            let mut next = Vec::with_capacity(top);
            let mut found = None;

            let mut curr = self.head_ref();

            for level in (0..top).rev() {
                let succ = loop {
                    let succ = match NodeRef::from_maybe_tagged(&curr.levels[level]) {
                        Ok(succ) => succ,
                        Err(Unlinking) => {
                            tracing::trace!(level, "search stood on a node being unlinked, restarting");
                            continue 'search;
                        }
                    };

                    match succ {
                        Some(succ) if succ.key() < key => curr = succ,
                        succ => break succ,
                    }
                };

                if found.is_none() && succ.as_ref().map_or(false, |succ| succ.key() == key) {
                    found = Some(level);
                }

                prev.push(curr.clone());
                next.push(succ);
            }

            prev.reverse();
            next.reverse();

            return SearchResult { prev, next, found };
        }
    }

    /// Gets the entry of `key`, if it is live.
    pub fn get(&self, key: &K) -> Option<Entry<'_, K, V>> {
        let search = self.find(key, 0);
        let level = search.found?;
        let node = search.next.into_iter().nth(level).flatten()?;

        if node.live() {
            Some(Entry::from(node))
        } else {
            None
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Gets the entry with the smallest key.
    pub fn front(&self) -> Option<Entry<'_, K, V>> {
        self.iter().next()
    }

    /// Gets the entry with the largest key.
    pub fn back(&self) -> Option<Entry<'_, K, V>> {
        'search: loop {
            let mut curr = self.head_ref();

            for level in (0..self.current_level()).rev() {
                let mut last = None;

                loop {
                    if level == 0 && !curr.is_head() && curr.live() {
                        last = Some(curr.clone());
                    }

                    match NodeRef::from_maybe_tagged(&curr.levels[level]) {
                        Ok(Some(next)) => curr = next,
                        Ok(None) => break,
                        Err(Unlinking) => continue 'search,
                    }
                }

                if level == 0 {
                    // Everything behind where we came down is tombstoned, fall back to
                    // a full scan.
                    return last.map(Entry::from).or_else(|| self.iter().last());
                }
            }

            return None;
        }
    }

    /// Scans the entries whose key lies within `range`, in ascending key order.
    ///
    /// The scan is weakly consistent: it never yields a half-linked or a removed
    /// entry, and it sees concurrent inserts only if they land ahead of its cursor.
    pub fn range<R>(&self, range: R) -> Range<'_, K, V, G, R>
    where
        R: RangeBounds<K>,
    {
        Range::new(self, range)
    }

    /// Scans all entries starting at `start` (inclusive), or at the smallest key if
    /// `start` is `None`.
    pub fn scan<'a>(
        &'a self,
        start: Option<&'a K>,
    ) -> Range<'a, K, V, G, (Bound<&'a K>, Bound<&'a K>)> {
        let start = start.map_or(Bound::Unbounded, Bound::Included);

        self.range((start, Bound::Unbounded))
    }

    pub fn iter(&self) -> Iter<'_, K, V, G> {
        Iter::from_list(self)
    }

    /// The node scans start from: the last node before `start`, or the head.
    fn seek(&self, start: Bound<&K>) -> NodeRef<'_, K, V> {
        match start {
            Bound::Unbounded => self.head_ref(),
            Bound::Included(key) | Bound::Excluded(key) => self.find(key, 0).prev.swap_remove(0),
        }
    }

    /// Inserts without copying out replaced values. Needs exclusive access, in which
    /// case validation cannot fail.
    fn insert_exclusive(&mut self, key: K, val: V) {
        let result = self.internal_insert(key, val, |node, val| unsafe {
            let old = node.swap_val(val);
            self.garbage.retire_val(old);
        });

        debug_assert!(result.is_ok(), "validation failed without concurrent writers");
    }
}

impl<K, V, G> SkipList<K, V, G>
where
    K: Ord,
{
    /// Walks the whole structure and panics on the first broken invariant:
    ///
    /// - every level is strictly increasing by key,
    /// - a node appears exactly on the levels below its height,
    /// - no link is left tagged, and no tombstoned or half-linked node is reachable,
    /// - the current level is the highest populated one,
    /// - the entry count matches the nodes on level 0.
    ///
    /// Takes `&mut self` as the walk does not protect what it visits.
    pub fn check_invariants(&mut self) {
        let head = self.head();
        let max_level = self.config.max_level;
        let current = self.current_level();

        assert!(
            current >= 1 && current <= max_level,
            "current level {} outside of 1..={}",
            current,
            max_level
        );

        // Number of level 0 nodes tall enough for each level.
        let mut expected = vec![0usize; max_level];

        for level in 0..max_level {
            let (mut node, tag) = head.levels[level].load_decomposed();
            assert_eq!(tag, 0, "head link tagged on level {}", level);

            let mut prev: Option<&Node<K, V>> = None;
            let mut count = 0;

            while !node.is_null() {
                let n = unsafe { &*node };

                assert!(
                    n.height() > level,
                    "node of height {} linked on level {}",
                    n.height(),
                    level
                );
                assert!(n.live(), "dead node reachable on level {}", level);
                assert_eq!(n.levels[level].load_tag(), 0, "tagged link on level {}", level);

                if let Some(p) = prev {
                    assert!(p.key() < n.key(), "level {} is not strictly increasing", level);
                }

                if level == 0 {
                    expected[..n.height()].iter_mut().for_each(|e| *e += 1);
                }

                count += 1;
                prev = Some(n);
                node = n.levels[level].load_ptr();
            }

            assert_eq!(count, expected[level], "gap in the towers on level {}", level);

            if level >= current {
                assert_eq!(count, 0, "level {} populated above the current level", level);
            } else if level == current - 1 && current > 1 {
                assert!(count > 0, "current level {} is empty", current);
            }
        }

        assert_eq!(expected[0], self.len(), "length out of sync with level 0");
    }
}

impl<K, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G> Debug for SkipList<K, V, G>
where
    K: Ord + Send + Sync + Debug + 'static,
    V: Send + Sync + Debug + 'static,
    G: LevelGenerator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_map();

        for entry in self.iter() {
            f.entry(entry.key(), entry.val());
        }

        f.finish()
    }
}

impl<K, V, G> Drop for SkipList<K, V, G> {
    fn drop(&mut self) {
        let mut node = self.head().levels[0].load_ptr();

        while !node.is_null() {
            unsafe {
                let temp = node;
                node = (&(*temp).levels)[0].load_ptr();
                Node::dealloc(temp);
            }
        }

        unsafe { Node::dealloc(self.head.as_ptr()) };

        // we see if we can drop some of the retired nodes as well.
        self.garbage.collect();
    }
}

unsafe impl<K, V, G> Send for SkipList<K, V, G>
where
    K: Send + Sync,
    V: Send + Sync,
    G: Send,
{
}

unsafe impl<K, V, G> Sync for SkipList<K, V, G>
where
    K: Send + Sync,
    V: Send + Sync,
    G: Sync,
{
}

/// A live entry of a [SkipList](SkipList).
///
/// Holding an entry keeps its node and its value from being reclaimed, even if the
/// entry is removed or its value replaced in the meantime; the entry keeps showing
/// what it saw.
pub struct Entry<'a, K, V> {
    node: NodeRef<'a, K, V>,
    val: NonNull<V>,
    _val_hazard: HazardPointer<'static>,
}

impl<'a, K, V> Entry<'a, K, V> {
    pub fn key(&self) -> &K {
        self.node.key()
    }

    pub fn val(&self) -> &V {
        // #Safety
        //
        // Our `HazardPointer` ensures that our pointer is valid.
        unsafe { self.val.as_ref() }
    }
}

impl<'a, K, V> From<NodeRef<'a, K, V>> for Entry<'a, K, V> {
    fn from(node: NodeRef<'a, K, V>) -> Self {
        let mut hazard = HazardPointer::new();
        let mut ptr = node.load_val();

        loop {
            hazard.protect_raw(ptr);
            fence(Ordering::SeqCst);

            // An unchanged slot was not swapped out yet, hence not retired either.
            let v_ptr = node.load_val();
            if core::ptr::eq(ptr, v_ptr) {
                break;
            }

            ptr = v_ptr;
        }

        Entry {
            // # Safety
            //
            // Only the head has an empty value slot.
            val: unsafe { NonNull::new_unchecked(ptr) },
            node,
            _val_hazard: hazard,
        }
    }
}

impl<'a, K, V> core::borrow::Borrow<K> for Entry<'a, K, V> {
    fn borrow(&self) -> &K {
        self.key()
    }
}

impl<'a, K, V> AsRef<V> for Entry<'a, K, V> {
    fn as_ref(&self) -> &V {
        self.val()
    }
}

impl<'a, K, V> Debug for Entry<'a, K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("key", self.key())
            .field("val", self.val())
            .finish()
    }
}

pub(crate) struct SearchResult<'a, K, V> {
    /// The last node before the key, per level.
    pub(crate) prev: Vec<NodeRef<'a, K, V>>,
    /// The node following `prev`, per level.
    pub(crate) next: Vec<Option<NodeRef<'a, K, V>>>,
    /// The highest level on which a node with the exact key follows `prev`.
    pub(crate) found: Option<usize>,
}

impl<'a, K, V> SearchResult<'a, K, V> {
    pub(crate) fn target(&self) -> Option<&NodeRef<'a, K, V>> {
        self.found.and_then(|level| self.next[level].as_ref())
    }
}

impl<'a, K, V> Debug for SearchResult<'a, K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("found", &self.found)
            .field("target", &self.target())
            .finish()
    }
}

/// A node kept alive by a hazard pointer for as long as the reference exists.
pub(crate) struct NodeRef<'a, K, V> {
    node: NonNull<Node<K, V>>,
    hazard: Option<HazardPointer<'static>>,
    _list: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    /// # Safety
    ///
    /// 1. `hazard` protects `node` and the protection was validated, or `node` is the
    ///    head of a list that outlives `'a`.
    pub(crate) unsafe fn protected(
        node: NonNull<Node<K, V>>,
        hazard: Option<HazardPointer<'static>>,
    ) -> Self {
        NodeRef {
            node,
            hazard,
            _list: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut Node<K, V> {
        self.node.as_ptr()
    }

    pub(crate) fn ptr_of(node: &Option<Self>) -> *mut Node<K, V> {
        node.as_ref()
            .map_or(core::ptr::null_mut(), |n| n.as_ptr())
    }
}

impl<'a, K, V> core::ops::Deref for NodeRef<'a, K, V> {
    type Target = Node<K, V>;

    fn deref(&self) -> &Self::Target {
        unsafe { self.node.as_ref() }
    }
}

impl<'a, K, V> Clone for NodeRef<'a, K, V> {
    fn clone(&self) -> Self {
        // The node is protected by `self` while the new protection becomes visible.
        let hazard = self.hazard.as_ref().map(|_| {
            let mut hazard = HazardPointer::new();
            hazard.protect_raw(self.node.as_ptr());
            fence(Ordering::SeqCst);
            hazard
        });

        NodeRef {
            node: self.node,
            hazard,
            _list: PhantomData,
        }
    }
}

impl<'a, K, V> Debug for NodeRef<'a, K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef").field("node", &**self).finish()
    }
}
