//! First-failure capture
//!
//! A single-slot cell shared by all workers. The first failure wins; later
//! ones are discarded by design, though the discard is counted and logged
//! so it never disappears silently. The slot is inspected once, on the
//! driver's thread, after every worker has joined.

use crate::error::PoolError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Holds at most one captured failure
#[derive(Debug, Default)]
pub(crate) struct FailureSlot {
    slot: Mutex<Option<PoolError>>,
    discarded: AtomicU64,
}

impl FailureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `failure` iff the slot is empty; returns whether it was stored
    ///
    /// Test and set run under one lock, so two racing workers can never
    /// both win.
    pub fn record(&self, failure: PoolError) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(failure);
            true
        } else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            warn!(error = %failure, "Discarding failure, an earlier one was already captured");
            false
        }
    }

    /// True if a failure has been captured
    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Failures recorded after the slot was already occupied
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Extract the captured failure for replay on the driver's thread
    pub fn take(&self) -> Option<PoolError> {
        self.slot.lock().take()
    }
}
