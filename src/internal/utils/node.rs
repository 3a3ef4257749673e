use core::{
    fmt::Debug,
    marker::PhantomData,
    mem::{ManuallyDrop, MaybeUninit},
    ops::Index,
    ptr::{self, NonNull},
    sync::atomic::{AtomicPtr, AtomicU32, Ordering},
};

use parking_lot::{Mutex, MutexGuard};

use crate::internal::sync::tagged::MaybeTagged;

const REMOVED_MASK: u32 = 1 << 31;

const LINKED_MASK: u32 = 1 << 30;

const HEAD_MASK: u32 = 1 << 29;

const HEIGHT_MASK: u32 = u8::MAX as u32;

/// The forward links of a node, one per level the node participates in.
pub(crate) struct Levels<K, V> {
    pub(crate) pointers: Box<[MaybeTagged<Node<K, V>>]>,
}

impl<K, V> Levels<K, V> {
    fn new(height: usize) -> Self {
        assert!(height <= super::HEIGHT && height > 0);

        Levels {
            pointers: (0..height).map(|_| MaybeTagged::null()).collect(),
        }
    }
}

impl<K, V> Index<usize> for Levels<K, V> {
    type Output = MaybeTagged<Node<K, V>>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.pointers[index]
    }
}

/// A key, a swappable value slot and a tower of forward links.
///
/// `height_and_state` packs the tower height into the low byte and keeps the
/// tombstone, the fully-linked marker and the head marker in the high bits.
///
/// The head of a list is a `Node` as well: it is always of maximum height, has no
/// key and no value, and is born fully linked.
pub(crate) struct Node<K, V> {
    key: MaybeUninit<K>,
    val: AtomicPtr<V>,
    pub(crate) height_and_state: AtomicU32,
    pub(crate) levels: Levels<K, V>,
    lock: Mutex<()>,
    _val: PhantomData<Box<V>>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, val: V, height: usize) -> *mut Self {
        Box::into_raw(Box::new(Node {
            key: MaybeUninit::new(key),
            val: AtomicPtr::new(Box::into_raw(Box::new(val))),
            height_and_state: AtomicU32::new(height as u32),
            levels: Levels::new(height),
            lock: Mutex::new(()),
            _val: PhantomData,
        }))
    }

    pub(crate) fn head(height: usize) -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Node {
            key: MaybeUninit::uninit(),
            val: AtomicPtr::new(ptr::null_mut()),
            height_and_state: AtomicU32::new(height as u32 | HEAD_MASK | LINKED_MASK),
            levels: Levels::new(height),
            lock: Mutex::new(()),
            _val: PhantomData,
        })))
    }

    /// # Safety
    ///
    /// 1. `ptr` came from [Node::new] or [Node::head] and is unreachable for everyone else.
    pub(crate) unsafe fn dealloc(ptr: *mut Self) {
        drop(Box::from_raw(ptr));
    }

    pub(crate) fn key(&self) -> &K {
        debug_assert!(!self.is_head(), "the head carries no key");

        // # Safety
        //
        // Only the head leaves `key` uninitialized and the head is never compared.
        unsafe { self.key.assume_init_ref() }
    }

    pub(crate) fn height(&self) -> usize {
        (self.height_and_state.load(Ordering::Relaxed) & HEIGHT_MASK) as usize
    }

    pub(crate) fn is_head(&self) -> bool {
        self.height_and_state.load(Ordering::Relaxed) & HEAD_MASK != 0
    }

    pub(crate) fn removed(&self) -> bool {
        self.height_and_state.load(Ordering::Acquire) & REMOVED_MASK != 0
    }

    /// Sets the tombstone. Fails if someone else already did.
    pub(crate) fn set_removed(&self) -> Result<(), ()> {
        let prev = self
            .height_and_state
            .fetch_or(REMOVED_MASK, Ordering::AcqRel);

        if prev & REMOVED_MASK != 0 {
            Err(())
        } else {
            Ok(())
        }
    }

    pub(crate) fn fully_linked(&self) -> bool {
        self.height_and_state.load(Ordering::Acquire) & LINKED_MASK != 0
    }

    pub(crate) fn set_fully_linked(&self) {
        self.height_and_state
            .fetch_or(LINKED_MASK, Ordering::Release);
    }

    /// Whether readers may report this node: every level spliced in and no tombstone.
    pub(crate) fn live(&self) -> bool {
        self.height_and_state.load(Ordering::Acquire) & (LINKED_MASK | REMOVED_MASK)
            == LINKED_MASK
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub(crate) fn load_val(&self) -> *mut V {
        self.val.load(Ordering::Acquire)
    }

    /// Publishes `val` and hands back the previous slot, which the caller has to retire.
    pub(crate) fn swap_val(&self, val: V) -> *mut V {
        self.val
            .swap(Box::into_raw(Box::new(val)), Ordering::AcqRel)
    }

    /// Takes the node apart. Only sound for nodes nobody else can reach anymore.
    pub(crate) fn into_parts(self: Box<Self>) -> (K, V) {
        debug_assert!(!self.is_head());

        let mut node = ManuallyDrop::new(*self);

        unsafe {
            let key = node.key.assume_init_read();
            let val = *Box::from_raw(*node.val.get_mut());
            ptr::drop_in_place(&mut node.levels);

            (key, val)
        }
    }
}

impl<K, V> Drop for Node<K, V> {
    fn drop(&mut self) {
        if !self.is_head() {
            unsafe { self.key.assume_init_drop() };
        }

        let val = *self.val.get_mut();

        if !val.is_null() {
            drop(unsafe { Box::from_raw(val) });
        }
    }
}

impl<K, V> Debug for Node<K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Node");

        if !self.is_head() {
            f.field("key", self.key());
        }

        f.field("height", &self.height())
            .field("removed", &self.removed())
            .field("linked", &self.fully_linked())
            .finish()
    }
}

#[cfg(test)]
mod node_test {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_set_removed() {
        let node = unsafe { &*Node::new(3, (), 5) };

        assert_eq!(node.height(), 5);
        assert!(!node.removed());
        assert!(!node.is_head());

        assert!(node.set_removed().is_ok());
        assert!(node.removed());
        assert!(node.set_removed().is_err());

        // the flags never bleed into the height
        assert_eq!(node.height(), 5);

        unsafe { Node::dealloc(node as *const _ as *mut Node<i32, ()>) };
    }

    #[test]
    fn test_live() {
        let node = unsafe { &*Node::new("key", 1, 2) };

        assert!(!node.live());
        node.set_fully_linked();
        assert!(node.live());
        assert_eq!(node.height(), 2);
        let _ = node.set_removed();
        assert!(!node.live());

        unsafe { Node::dealloc(node as *const _ as *mut Node<&str, i32>) };
    }

    #[test]
    fn test_head() {
        let head_ptr = Node::<u32, u32>::head(32);
        let head = unsafe { head_ptr.as_ref() };

        assert!(head.is_head());
        assert!(head.fully_linked());
        assert_eq!(head.height(), 32);
        assert!(head.load_val().is_null());
        assert!((0..32).all(|l| head.levels[l].load_ptr().is_null()));

        unsafe { Node::dealloc(head_ptr.as_ptr()) };
    }

    #[test]
    fn test_swap_val() {
        let node = unsafe { &*Node::new(1, String::from("old"), 1) };

        let old = node.swap_val(String::from("new"));
        assert_eq!(unsafe { &*old }, "old");
        assert_eq!(unsafe { &*node.load_val() }, "new");

        unsafe {
            drop(Box::from_raw(old));
            Node::dealloc(node as *const _ as *mut Node<i32, String>);
        }
    }

    #[test]
    fn test_drop_releases_key_and_value() {
        let drops = Arc::new(AtomicUsize::new(0));
        let node = Node::new(Counted(drops.clone()), Counted(drops.clone()), 3);

        unsafe { Node::dealloc(node) };

        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_into_parts() {
        let drops = Arc::new(AtomicUsize::new(0));
        let node = Node::new(7, Counted(drops.clone()), 4);

        let (key, val) = unsafe { Box::from_raw(node) }.into_parts();

        assert_eq!(key, 7);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(val);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
