//! Deferred execution and signal masking.
//!
//! Driver samples can arrive from a signal-driven context that must not
//! allocate. Work that needs the allocator is queued here and run later on
//! the main flow by `DeviceRegistry::process_work_queue`. While the main
//! flow mutates state shared with that context it holds a `SignalGuard`.
//!
//! `SignalMask` only records that delivery is blocked. Exclusion itself
//! comes from `&mut` access: the driver path and the resize task both need
//! `&mut InputDevice`, so they can never overlap. The driver path asserts
//! in debug builds that it is not entered while a guard is held.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::input::device::DeviceRegistry;

// ============================================================================
// Work Queue
// ============================================================================

/// A deferred work proc. Returning `true` means the proc is done and can be
/// dropped; `false` keeps it queued for the next pass.
pub type WorkProc = Box<dyn FnMut(&mut DeviceRegistry) -> bool + Send>;

/// Queue of work procs waiting for the main flow
#[derive(Default)]
pub struct WorkQueue {
    procs: Mutex<VecDeque<WorkProc>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            procs: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<WorkProc>> {
        self.procs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a proc for execution
    pub fn push(&self, proc_: WorkProc) {
        self.lock().push_back(proc_);
    }

    /// Take all pending procs
    pub fn take_all(&self) -> Vec<WorkProc> {
        self.lock().drain(..).collect()
    }

    /// Check if there are pending procs
    pub fn has_work(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Get number of pending procs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_work()
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").field("pending", &self.len()).finish()
    }
}

// ============================================================================
// Signal Mask
// ============================================================================

/// Tracks whether input signal delivery is currently blocked.
///
/// Blocking nests: delivery resumes once every guard has been dropped.
#[derive(Debug, Default)]
pub struct SignalMask {
    depth: AtomicU32,
}

impl SignalMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block signal delivery until the returned guard is dropped
    pub fn block(&self) -> SignalGuard<'_> {
        if self.depth.fetch_add(1, Ordering::AcqRel) == 0 {
            tracing::trace!("Input signals blocked");
        }
        SignalGuard { mask: self }
    }

    pub fn is_blocked(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }

    fn release(&self) {
        if self.depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            tracing::trace!("Input signals released");
        }
    }
}

/// RAII guard returned by [`SignalMask::block`]
#[derive(Debug)]
pub struct SignalGuard<'a> {
    mask: &'a SignalMask,
}

impl Drop for SignalGuard<'_> {
    fn drop(&mut self) {
        self.mask.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_guard_nesting() {
        let mask = SignalMask::new();
        assert!(!mask.is_blocked());
        {
            let _outer = mask.block();
            assert!(mask.is_blocked());
            {
                let _inner = mask.block();
                assert!(mask.is_blocked());
            }
            assert!(mask.is_blocked());
        }
        assert!(!mask.is_blocked());
    }

    #[test]
    fn test_work_queue_take_all() {
        let queue = WorkQueue::new();
        assert!(queue.is_empty());
        queue.push(Box::new(|_| true));
        queue.push(Box::new(|_| false));
        assert_eq!(queue.len(), 2);

        let procs = queue.take_all();
        assert_eq!(procs.len(), 2);
        assert!(!queue.has_work());
    }
}
