//! Observer contract and the latch observer used by cursors.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Receives change events for a registered address.
pub trait ChangeObserver: Send + Sync {
    /// `address` is the published address, which may be a descendant of the
    /// registered one.
    fn on_change(&self, address: &str);
}

/// Latches once any change is delivered.
#[derive(Debug, Default)]
pub struct ChangeFlag {
    changed: AtomicBool,
    deliveries: AtomicUsize,
}

impl ChangeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Total deliveries since creation.
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::Acquire)
    }

    /// Clears the latch and returns whether it was set.
    pub fn reset(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

impl ChangeObserver for ChangeFlag {
    fn on_change(&self, _address: &str) {
        self.deliveries.fetch_add(1, Ordering::AcqRel);
        self.changed.store(true, Ordering::Release);
    }
}
