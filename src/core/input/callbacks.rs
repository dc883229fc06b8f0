//! Interfaces to the parts of the input stack the touch core calls out to.
//!
//! Window hit-testing, device button/grab state and event delivery are
//! owned elsewhere. The touch core only sees them through these traits.

use super::event::{TouchEvent, TouchEventType, TouchFlags};
use super::sprite::{SpriteTrace, WindowId};
use crate::core::errors::Result;

/// Window hit-testing
pub trait WindowPicker {
    /// Extend `sprite` (already reset to its root) down to the deepest
    /// window containing `(x, y)`.
    fn xy_to_window(&self, sprite: &mut SpriteTrace, x: f64, y: f64) -> Result<()>;
}

/// The device's currently active grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabInfo {
    /// The grab was activated by a passive (button/touch) grab
    pub from_passive_grab: bool,
    /// The grab is a core or XI2 pointer grab
    pub is_pointer_grab: bool,
}

/// Buttons currently held on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonsDown {
    pub pointer: u32,
    pub touch: u32,
}

impl ButtonsDown {
    pub fn any(&self) -> bool {
        self.pointer > 0 || self.touch > 0
    }
}

/// Device button/motion state and grab bookkeeping
pub trait DeviceStateHandler {
    /// Feed a pointer-emulated touch event into the device state
    fn emit_emulated_event(&mut self, device_id: u32, event: &TouchEvent);
    fn active_grab(&self, device_id: u32) -> Option<GrabInfo>;
    fn buttons_down(&self, device_id: u32) -> ButtonsDown;
    fn deactivate_grab(&mut self, device_id: u32);
}

/// Release an implicit pointer grab once nothing is held down any more.
///
/// Returns whether the grab was deactivated.
pub fn deactivate_active_grab_if_eligible(handler: &mut dyn DeviceStateHandler, device_id: u32) -> bool {
    let Some(grab) = handler.active_grab(device_id) else {
        return false;
    };
    if !grab.from_passive_grab || !grab.is_pointer_grab || handler.buttons_down(device_id).any() {
        return false;
    }

    handler.deactivate_grab(device_id);
    tracing::debug!("Device {}: passive pointer grab released after emulated touch end", device_id);
    true
}

/// Delivery of regenerated events to a grab or selection owner
pub trait EventSink {
    fn deliver(&mut self, resource: u32, event: TouchEvent);
}

// ============================================================================
// Stub Implementations
// ============================================================================

/// A window in a [`StubWindowPicker`] tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StubWindow {
    pub id: WindowId,
    pub parent: WindowId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl StubWindow {
    pub fn new(id: u32, parent: u32, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: WindowId(id),
            parent: WindowId(parent),
            x,
            y,
            width,
            height,
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Hit-tests against a flat list of windows in stacking order (last on top).
/// Coordinates are absolute.
#[derive(Debug, Clone, Default)]
pub struct StubWindowPicker {
    pub windows: Vec<StubWindow>,
}

impl StubWindowPicker {
    pub fn new(windows: Vec<StubWindow>) -> Self {
        Self { windows }
    }
}

impl WindowPicker for StubWindowPicker {
    fn xy_to_window(&self, sprite: &mut SpriteTrace, x: f64, y: f64) -> Result<()> {
        let mut parent = sprite.hit_window().unwrap_or(WindowId::NONE);
        while let Some(child) = self
            .windows
            .iter()
            .rev()
            .find(|w| w.parent == parent && w.contains(x, y))
        {
            sprite.push(child.id)?;
            parent = child.id;
        }
        Ok(())
    }
}

/// Device state that records emulated events and tracks a single grab
#[derive(Debug, Clone, Default)]
pub struct RecordingDeviceState {
    pub emitted: Vec<TouchEvent>,
    pub grab: Option<GrabInfo>,
    pub buttons: ButtonsDown,
    pub deactivations: u32,
}

impl DeviceStateHandler for RecordingDeviceState {
    fn emit_emulated_event(&mut self, _device_id: u32, event: &TouchEvent) {
        if event.flags.contains(TouchFlags::POINTER_EMULATED) {
            match event.kind {
                TouchEventType::Begin => self.buttons.touch += 1,
                TouchEventType::End => self.buttons.touch = self.buttons.touch.saturating_sub(1),
                _ => {}
            }
        }
        self.emitted.push(event.clone());
    }

    fn active_grab(&self, _device_id: u32) -> Option<GrabInfo> {
        self.grab
    }

    fn buttons_down(&self, _device_id: u32) -> ButtonsDown {
        self.buttons
    }

    fn deactivate_grab(&mut self, _device_id: u32) {
        self.grab = None;
        self.deactivations += 1;
    }
}

/// Collects delivered events in order
#[derive(Debug, Clone, Default)]
pub struct VecEventSink {
    pub events: Vec<(u32, TouchEvent)>,
}

impl EventSink for VecEventSink {
    fn deliver(&mut self, resource: u32, event: TouchEvent) {
        self.events.push((resource, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::sprite::Screen;

    #[test]
    fn test_stub_picker_walks_down() {
        let picker = StubWindowPicker::new(vec![
            StubWindow::new(2, 1, 0.0, 0.0, 100.0, 100.0),
            StubWindow::new(3, 2, 10.0, 10.0, 20.0, 20.0),
            StubWindow::new(4, 1, 200.0, 0.0, 50.0, 50.0),
        ]);
        let mut trace = SpriteTrace::new(Screen::new(0, WindowId(1)), 4).unwrap();
        trace.reset_to(WindowId(1)).unwrap();
        picker.xy_to_window(&mut trace, 15.0, 15.0).unwrap();
        assert_eq!(trace.windows(), &[WindowId(1), WindowId(2), WindowId(3)]);

        trace.reset_to(WindowId(1)).unwrap();
        picker.xy_to_window(&mut trace, 500.0, 500.0).unwrap();
        assert_eq!(trace.windows(), &[WindowId(1)]);
    }

    #[test]
    fn test_grab_released_only_when_eligible() {
        let mut state = RecordingDeviceState {
            grab: Some(GrabInfo { from_passive_grab: true, is_pointer_grab: true }),
            buttons: ButtonsDown { pointer: 1, touch: 0 },
            ..Default::default()
        };
        assert!(!deactivate_active_grab_if_eligible(&mut state, 2));

        state.buttons.pointer = 0;
        state.grab = Some(GrabInfo { from_passive_grab: false, is_pointer_grab: true });
        assert!(!deactivate_active_grab_if_eligible(&mut state, 2));

        state.grab = Some(GrabInfo { from_passive_grab: true, is_pointer_grab: true });
        assert!(deactivate_active_grab_if_eligible(&mut state, 2));
        assert_eq!(state.deactivations, 1);
        assert!(state.grab.is_none());

        assert!(!deactivate_active_grab_if_eligible(&mut state, 2));
    }
}
