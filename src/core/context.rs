//! Process-wide touch state.
//!
//! State shared by every touch device in the process lives here and
//! is handed to each device as an `Arc<TouchContext>`. It is created once
//! and lives for the rest of the process.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::TouchConfig;
use crate::core::errors::{Result, TouchError};
use crate::core::input::resize::ResizeWaiting;
use crate::core::input::sprite::Screen;
use crate::core::runtime::{SignalMask, WorkQueue};

// ============================================================================
// Client ID Allocation
// ============================================================================

/// Hands out protocol-visible touch ids. 0 is reserved as "no id".
#[derive(Debug)]
pub struct ClientIdAllocator {
    next: AtomicU32,
}

impl Default for ClientIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl ClientIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the counter at `first` (0 is bumped to 1)
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.max(1)),
        }
    }

    /// Return the current id and advance the counter, skipping 0 on wrap
    pub fn next_id(&self) -> u32 {
        let advance = |n: u32| Some(if n == u32::MAX { 1 } else { n + 1 });
        match self.next.fetch_update(Ordering::AcqRel, Ordering::Acquire, advance) {
            Ok(id) | Err(id) => id,
        }
    }

    /// Id that the next call to `next_id` returns
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Acquire)
    }
}

// ============================================================================
// Touch Context
// ============================================================================

/// Shared state for every touch device in the process
#[derive(Debug)]
pub struct TouchContext {
    pub config: TouchConfig,
    pub client_ids: ClientIdAllocator,
    pub resize_waiting: ResizeWaiting,
    pub signals: SignalMask,
    pub work: WorkQueue,
    screens: Vec<Screen>,
}

impl TouchContext {
    pub fn new(config: TouchConfig, screens: Vec<Screen>) -> Result<Self> {
        config.validate()?;
        if screens.is_empty() {
            return Err(TouchError::NoScreens);
        }

        Ok(Self {
            resize_waiting: ResizeWaiting::new(config.max_devices),
            client_ids: ClientIdAllocator::new(),
            signals: SignalMask::new(),
            work: WorkQueue::new(),
            screens,
            config,
        })
    }

    /// Screen 0, whose root seeds every fresh sprite trace
    pub fn primary_screen(&self) -> Screen {
        self.screens[0]
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::sprite::WindowId;

    #[test]
    fn test_client_ids_start_at_one() {
        let ids = ClientIdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
        assert_eq!(ids.peek(), 4);
    }

    #[test]
    fn test_client_ids_skip_zero_on_wrap() {
        let ids = ClientIdAllocator::starting_at(u32::MAX - 1);
        assert_eq!(ids.next_id(), u32::MAX - 1);
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_context_requires_screen() {
        let err = TouchContext::new(TouchConfig::default(), Vec::new()).unwrap_err();
        assert_eq!(err, TouchError::NoScreens);

        let screen = Screen::new(0, WindowId(1));
        let ctx = TouchContext::new(TouchConfig::default(), vec![screen]).unwrap();
        assert_eq!(ctx.primary_screen(), screen);
        assert!(!ctx.signals.is_blocked());
        assert!(ctx.work.is_empty());
    }
}
