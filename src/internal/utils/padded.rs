use core::ops::{Deref, DerefMut};

/// Keeps the wrapped value on its own cache line(s), so the counters every writer
/// touches do not share a line with the head tower readers hammer.
#[repr(C, align(128))]
pub(crate) struct Padded<T>(T);

impl<T> Padded<T> {
    pub(crate) fn new(inner: T) -> Self {
        Padded(inner)
    }
}

impl<T> Deref for Padded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Padded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
