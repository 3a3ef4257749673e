use haphazard::{Domain, Global};

use core::sync::atomic::AtomicUsize;

mod node;
mod padded;

pub(crate) use node::Node;
pub(crate) use padded::Padded;

pub(crate) const HEIGHT_BITS: usize = 5;

pub(crate) const HEIGHT: usize = 1 << HEIGHT_BITS;

/// The garbage collection of the list.
/// Utilizes Hazard Pointers under the hood to prevent use-after-frees and
/// the ABA problem: unlinked nodes and replaced value slots are handed to the
/// domain, which frees them once no reader protects them anymore.
pub(crate) struct Can {
    pub(crate) domain: &'static Domain<Global>,
}

impl Can {
    pub(crate) fn new() -> Self {
        Can {
            domain: Domain::global(),
        }
    }

    /// # Safety
    ///
    /// 1. `node` is unlinked on every level and nobody can find it from the head anymore.
    /// 2. `node` is retired at most once.
    pub(crate) unsafe fn retire_node<K, V>(&self, node: *mut Node<K, V>)
    where
        K: Send + 'static,
        V: Send + 'static,
    {
        self.domain
            .retire_ptr::<Node<K, V>, Box<Node<K, V>>>(node);
    }

    /// # Safety
    ///
    /// 1. `val` was swapped out of its node and is no longer reachable through it.
    pub(crate) unsafe fn retire_val<V>(&self, val: *mut V)
    where
        V: Send + 'static,
    {
        self.domain.retire_ptr::<V, Box<V>>(val);
    }

    /// Frees whatever retired memory is no longer protected.
    pub(crate) fn collect(&self) -> usize {
        self.domain.eager_reclaim()
    }
}

pub(crate) struct ListState {
    pub(crate) len: AtomicUsize,
    /// The highest level holding at least one node besides the head.
    pub(crate) current_level: AtomicUsize,
}

impl ListState {
    pub(crate) fn new() -> Self {
        ListState {
            len: AtomicUsize::new(0),
            current_level: AtomicUsize::new(1),
        }
    }
}
