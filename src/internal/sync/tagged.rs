use core::sync::atomic::{fence, AtomicPtr, Ordering};

use haphazard::HazardPointer;

use super::NodeRef;
use crate::internal::utils::Node;

/// Tag carried by the outgoing link of a level that is being unlinked. A reader
/// seeing it can no longer trust the link as a pass-through.
pub(crate) const UNLINKING: usize = 1;

/// An atomic pointer whose alignment bits carry a tag.
pub(crate) struct MaybeTagged<T>(AtomicPtr<T>);

impl<T> MaybeTagged<T> {
    pub(crate) fn null() -> Self {
        MaybeTagged(AtomicPtr::new(core::ptr::null_mut()))
    }

    pub(crate) fn load_ptr(&self) -> *mut T {
        self.load_decomposed().0
    }

    pub(crate) fn load_decomposed(&self) -> (*mut T, usize) {
        let raw = self.0.load(Ordering::Acquire);
        Self::decompose_raw(raw)
    }

    #[inline]
    fn decompose_raw(raw: *mut T) -> (*mut T, usize) {
        (
            (raw as usize & !unused_bits::<T>()) as *mut T,
            raw as usize & unused_bits::<T>(),
        )
    }

    pub(crate) fn store_composed(&self, ptr: *mut T, tag: usize) {
        let tagged = Self::compose_raw(ptr, tag);

        self.0.store(tagged, Ordering::Release);
    }

    #[inline]
    fn compose_raw(ptr: *mut T, tag: usize) -> *mut T {
        ((ptr as usize & !unused_bits::<T>()) | (tag & unused_bits::<T>())) as *mut T
    }

    pub(crate) fn store_ptr(&self, ptr: *mut T) {
        self.store_composed(ptr, 0);
    }

    pub(crate) fn compare_exchange_with_tag(
        &self,
        expected: *mut T,
        e_tag: usize,
        new: *mut T,
        n_tag: usize,
    ) -> Result<(*mut T, usize), (*mut T, usize)> {
        match self.0.compare_exchange(
            Self::compose_raw(expected, e_tag),
            Self::compose_raw(new, n_tag),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(new) => Ok(Self::decompose_raw(new)),
            Err(other) => Err(Self::decompose_raw(other)),
        }
    }

    /// Replaces the tag while leaving the pointer untouched.
    pub(crate) fn tag(&self, tag: usize) {
        let (mut old_ptr, mut old_tag) = self.load_decomposed();

        while let Err((other_ptr, other_tag)) =
            self.compare_exchange_with_tag(old_ptr, old_tag, old_ptr, tag)
        {
            (old_ptr, old_tag) = (other_ptr, other_tag);
        }
    }

    pub(crate) fn load_tag(&self) -> usize {
        self.load_decomposed().1
    }
}

const fn align<T>() -> usize {
    core::mem::align_of::<T>()
}

const fn unused_bits<T>() -> usize {
    (1 << align::<T>().trailing_zeros()) - 1
}

/// The link a reader tried to follow is being unlinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unlinking;

impl<'a, K, V> NodeRef<'a, K, V> {
    /// Follows `link` and protects its target.
    ///
    /// The owner of `link` must itself be protected. The protection is only
    /// published once the link is observed unchanged and untagged after the hazard
    /// is visible: an untagged link means its owner is still spliced in at this level,
    /// so the target was still reachable, and thus not yet retired, at that point.
    pub(crate) fn from_maybe_tagged(
        maybe_tagged: &MaybeTagged<Node<K, V>>,
    ) -> Result<Option<Self>, Unlinking> {
        let (mut ptr, mut tag) = maybe_tagged.load_decomposed();
        let mut hazard: Option<HazardPointer<'static>> = None;

        loop {
            if tag != 0 {
                return Err(Unlinking);
            }

            if ptr.is_null() {
                return Ok(None);
            }

            let protector = hazard.get_or_insert_with(HazardPointer::new);
            protector.protect_raw(ptr);
            fence(Ordering::SeqCst);

            let (v_ptr, v_tag) = maybe_tagged.load_decomposed();

            if core::ptr::eq(ptr, v_ptr) && v_tag == 0 {
                // # Safety
                //
                // `ptr` was checked to be non-null above.
                return Ok(Some(unsafe {
                    NodeRef::protected(core::ptr::NonNull::new_unchecked(ptr), hazard.take())
                }));
            }

            (ptr, tag) = (v_ptr, v_tag);
        }
    }
}
