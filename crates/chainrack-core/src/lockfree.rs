//! Lock-free primitives shared between the control and render contexts.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Clone for AtomicFlag {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Atomic cell holding a small `Copy` enum encoded as `u8`.
#[derive(Debug)]
pub(crate) struct AtomicState {
    value: AtomicU8,
}

impl AtomicState {
    pub(crate) fn new(value: u8) -> Self {
        Self {
            value: AtomicU8::new(value),
        }
    }

    #[inline]
    pub(crate) fn load(&self) -> u8 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn store(&self, value: u8) {
        self.value.store(value, Ordering::Release);
    }
}
