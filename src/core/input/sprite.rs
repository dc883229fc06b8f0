//! Sprite traces and their resolution for touch points.
//!
//! A sprite trace is the chain of windows from the root down to the window
//! under a touch. Every event of the touch is routed along it, so it is
//! fixed when the touch begins and kept until the touch ends.

use std::collections::TryReserveError;

use super::callbacks::WindowPicker;
use super::device::{InputDevice, TouchMode};
use super::event::{TouchEvent, TouchEventType};
use crate::core::errors::{Result, TouchError};

/// Slots added to a trace buffer when hit-testing runs out of room
const TRACE_GROW: usize = 10;

/// Server-side window identifier. 0 is "no window".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl WindowId {
    pub const NONE: WindowId = WindowId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// A screen and its root window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Screen {
    pub id: u32,
    pub root: WindowId,
}

impl Screen {
    pub fn new(id: u32, root: WindowId) -> Self {
        Self { id, root }
    }
}

/// Window chain from root (index 0) to the window under the sprite.
///
/// The buffer keeps its length across touches; only the first `good`
/// entries are meaningful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteTrace {
    trace: Vec<WindowId>,
    good: usize,
    pub screen: Screen,
}

impl SpriteTrace {
    /// Allocate a `size`-slot buffer with the screen's root in slot 0.
    /// The trace starts out invalid.
    pub fn new(screen: Screen, size: usize) -> std::result::Result<Self, TryReserveError> {
        let mut trace = Vec::new();
        trace.try_reserve_exact(size)?;
        trace.resize(size, WindowId::NONE);
        if let Some(first) = trace.first_mut() {
            *first = screen.root;
        }
        Ok(Self { trace, good: 0, screen })
    }

    /// Buffer length
    pub fn size(&self) -> usize {
        self.trace.len()
    }

    /// Number of valid entries
    pub fn good(&self) -> usize {
        self.good
    }

    pub fn is_valid(&self) -> bool {
        self.good > 0
    }

    /// The valid part of the trace
    pub fn windows(&self) -> &[WindowId] {
        &self.trace[..self.good]
    }

    /// Deepest valid window
    pub fn hit_window(&self) -> Option<WindowId> {
        self.windows().last().copied()
    }

    /// Slot 0, valid or not
    pub fn root(&self) -> Option<WindowId> {
        self.trace.first().copied()
    }

    pub fn invalidate(&mut self) {
        self.good = 0;
    }

    /// Restart the trace at `root`, leaving exactly one valid entry
    pub fn reset_to(&mut self, root: WindowId) -> std::result::Result<(), TryReserveError> {
        if self.trace.is_empty() {
            self.grow_to(TRACE_GROW)?;
        }
        self.trace[0] = root;
        self.good = 1;
        Ok(())
    }

    /// Append a child window below the current deepest entry
    pub fn push(&mut self, window: WindowId) -> std::result::Result<(), TryReserveError> {
        if self.good >= self.trace.len() {
            self.grow_to(self.trace.len() + TRACE_GROW)?;
        }
        self.trace[self.good] = window;
        self.good += 1;
        Ok(())
    }

    /// Copy another trace's valid entries, growing this buffer if needed
    pub fn copy_from(&mut self, src: &SpriteTrace) -> std::result::Result<(), TryReserveError> {
        if src.good > self.trace.len() {
            if let Err(e) = self.grow_to(src.trace.len()) {
                self.good = 0;
                return Err(e);
            }
        }
        self.trace[..src.good].copy_from_slice(&src.trace[..src.good]);
        self.good = src.good;
        self.screen = src.screen;
        Ok(())
    }

    /// Drop the buffer itself
    pub fn release(&mut self) {
        self.trace = Vec::new();
        self.good = 0;
    }

    fn grow_to(&mut self, size: usize) -> std::result::Result<(), TryReserveError> {
        if size <= self.trace.len() {
            return Ok(());
        }
        self.trace.try_reserve_exact(size - self.trace.len())?;
        self.trace.resize(size, WindowId::NONE);
        Ok(())
    }
}

// ============================================================================
// Sprite Resolution
// ============================================================================

impl InputDevice {
    /// Copy a donor trace into touch `index`: another touch of this device
    /// with a valid trace, or else the device's pointer sprite.
    pub fn build_dependent_sprite_trace(&mut self, index: usize) -> Result<()> {
        let device = self.id;
        let pointer_sprite = self.pointer_sprite.as_ref();
        let Some(touch) = self.touch.as_mut() else {
            return Err(TouchError::NotTouchDevice { device });
        };
        if index >= touch.touches.len() {
            return Err(TouchError::InvalidTouchIndex(index));
        }

        let donor = (0..touch.touches.len()).find(|&i| {
            let t = &touch.touches[i];
            i != index && t.active && t.sprite.is_valid()
        });

        let mut sprite = std::mem::take(&mut touch.touches[index].sprite);
        let result = match (donor, pointer_sprite) {
            (Some(i), _) => sprite.copy_from(&touch.touches[i].sprite).map_err(TouchError::from),
            (None, Some(pointer)) => sprite.copy_from(pointer).map_err(TouchError::from),
            (None, None) => Err(TouchError::MissingSpriteSource { device }),
        };
        touch.touches[index].sprite = sprite;

        if let Err(e) = &result {
            tracing::debug!("Device {}: dependent sprite trace for touch {} failed: {}", device, index, e);
        }
        result
    }

    /// Make sure touch `index` has a sprite trace to route `event` along.
    ///
    /// A TouchEnd always passes so the touch can be finished. Other events
    /// pass if a trace already exists. A TouchBegin builds the trace and
    /// allocates the listener array for it.
    pub fn ensure_sprite(
        &mut self,
        index: usize,
        event: &TouchEvent,
        picker: &dyn WindowPicker,
    ) -> Result<()> {
        let device = self.id;
        let pointer_screen = self.pointer_sprite.as_ref().map(|s| s.screen);
        let mode = match &self.touch {
            Some(t) => t.mode,
            None => return Err(TouchError::NotTouchDevice { device }),
        };
        let valid = self
            .touch_point(index)
            .ok_or(TouchError::InvalidTouchIndex(index))?
            .sprite
            .is_valid();

        match event.kind {
            TouchEventType::End => return Ok(()),
            TouchEventType::Begin => {}
            _ if valid => return Ok(()),
            _ => return Err(TouchError::EmptySpriteTrace),
        }

        match mode {
            TouchMode::Direct => {
                let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
                // Hit-test from the root of the screen the physical pointer is on
                let screen = pointer_screen.unwrap_or(ti.sprite.screen);
                ti.sprite.screen = screen;
                let picked = ti
                    .sprite
                    .reset_to(screen.root)
                    .map_err(TouchError::from)
                    .and_then(|()| picker.xy_to_window(&mut ti.sprite, event.root_x, event.root_y));
                if let Err(e) = picked {
                    ti.sprite.invalidate();
                    return Err(e);
                }
            }
            TouchMode::Dependent => self.build_dependent_sprite_trace(index)?,
        }

        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        if !ti.sprite.is_valid() {
            return Err(TouchError::EmptySpriteTrace);
        }

        // At most one grab per window plus the bottom-most event selection
        if let Err(e) = ti.allocate_listeners(ti.sprite.good() + 1) {
            ti.sprite.invalidate();
            return Err(e.into());
        }

        tracing::trace!(
            "Device {}: touch {} routed through {} windows",
            device,
            ti.client_id,
            ti.sprite.good()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Screen {
        Screen::new(0, WindowId(1))
    }

    #[test]
    fn test_new_trace_is_seeded_but_invalid() {
        let trace = SpriteTrace::new(screen(), 32).unwrap();
        assert_eq!(trace.size(), 32);
        assert_eq!(trace.root(), Some(WindowId(1)));
        assert!(!trace.is_valid());
        assert!(trace.windows().is_empty());
    }

    #[test]
    fn test_push_grows_buffer() {
        let mut trace = SpriteTrace::new(screen(), 1).unwrap();
        trace.reset_to(WindowId(1)).unwrap();
        trace.push(WindowId(2)).unwrap();
        trace.push(WindowId(3)).unwrap();
        assert_eq!(trace.windows(), &[WindowId(1), WindowId(2), WindowId(3)]);
        assert_eq!(trace.size(), 11);
        assert_eq!(trace.hit_window(), Some(WindowId(3)));
    }

    #[test]
    fn test_copy_from_longer_trace() {
        let mut src = SpriteTrace::new(screen(), 2).unwrap();
        src.reset_to(WindowId(1)).unwrap();
        for w in 2..=5 {
            src.push(WindowId(w)).unwrap();
        }

        let mut dst = SpriteTrace::new(screen(), 2).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.windows(), src.windows());
        assert!(dst.size() >= src.good());

        // A shorter donor reuses the bigger buffer
        let size = dst.size();
        let mut short = SpriteTrace::new(screen(), 4).unwrap();
        short.reset_to(WindowId(1)).unwrap();
        dst.copy_from(&short).unwrap();
        assert_eq!(dst.good(), 1);
        assert_eq!(dst.size(), size);
    }
}
