//! Transaction id allocator for OPACK requests.

use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonically increasing counter for the OPACK `_x` transaction id,
/// seeded from the OS RNG so two sessions never start at the same value.
/// Lock-free so cloned [`crate::Protocol`] handles can share one
/// generator without contending on a mutex.
pub(crate) struct XidGenerator(AtomicU32);

impl XidGenerator {
    pub(crate) fn new() -> Self {
        Self(AtomicU32::new(rand::random()))
    }

    pub(crate) fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
