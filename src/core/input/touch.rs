//! Protocol-facing touch points.
//!
//! A touch point is what clients see: it carries the client id, the sprite
//! trace the touch is routed along, the listeners that may receive it and,
//! when a grab needs it, the touch's event history.

use std::collections::TryReserveError;

use super::callbacks::{deactivate_active_grab_if_eligible, DeviceStateHandler};
use super::device::InputDevice;
use super::event::{TouchEvent, TouchEventType, TouchFlags};
use super::history::TouchHistory;
use super::sprite::{SpriteTrace, WindowId};
use super::valuator::ValuatorMask;
use crate::core::errors::{Result, TouchError};

/// Client id of a slot that has never been used
pub const UNUSED_CLIENT_ID: u32 = u32::MAX;

/// What kind of target a listener is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Grab,
    PointerGrab,
    Selection,
    PointerSelection,
}

impl ListenerKind {
    pub fn is_grab(&self) -> bool {
        matches!(self, ListenerKind::Grab | ListenerKind::PointerGrab)
    }
}

/// A grab or event selection on one window of the sprite trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchListener {
    /// Grab or client resource that receives the events
    pub resource: u32,
    pub kind: ListenerKind,
    pub window: WindowId,
}

/// A protocol-facing touch point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchPoint {
    pub active: bool,
    /// Client-facing id; 0 while inactive
    pub client_id: u32,
    /// Physical device the touch came from
    pub source_id: u32,
    pub emulate_pointer: bool,
    /// Set once delivery is done and the touch only waits to be ended
    pub pending_finish: bool,
    pub valuators: ValuatorMask,
    pub sprite: SpriteTrace,
    pub listeners: Vec<TouchListener>,
    pub(crate) max_listeners: usize,
    pub num_grabs: usize,
    pub history: Option<TouchHistory>,
}

impl TouchPoint {
    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Room in the listener array; 0 when it is not allocated
    pub fn max_listeners(&self) -> usize {
        self.max_listeners
    }

    pub(crate) fn allocate_listeners(&mut self, count: usize) -> std::result::Result<(), TryReserveError> {
        let mut listeners = Vec::new();
        listeners.try_reserve_exact(count)?;
        self.listeners = listeners;
        self.max_listeners = count;
        Ok(())
    }

    fn release_listeners(&mut self) {
        self.listeners = Vec::new();
        self.max_listeners = 0;
        self.num_grabs = 0;
    }

    /// Record a delivery target. Fails when the array is full or unallocated.
    pub fn add_listener(&mut self, listener: TouchListener) -> bool {
        if self.listeners.len() >= self.max_listeners {
            return false;
        }
        if listener.kind.is_grab() {
            self.num_grabs += 1;
        }
        self.listeners.push(listener);
        true
    }

    /// Reset to inactive, keeping the mask and trace buffers
    fn deactivate(&mut self) {
        self.active = false;
        self.pending_finish = false;
        self.sprite.invalidate();
        self.release_listeners();
        self.client_id = 0;
        self.free_history();
        self.valuators.zero();
    }
}

impl InputDevice {
    /// A fresh, inactive touch point for this device
    pub fn init_touch_point(&self) -> Result<TouchPoint> {
        let valuators = ValuatorMask::try_new(self.num_axes)?;
        let sprite = SpriteTrace::new(self.ctx.primary_screen(), self.ctx.config.sprite_trace_size)?;

        Ok(TouchPoint {
            valuators,
            sprite,
            client_id: UNUSED_CLIENT_ID,
            ..Default::default()
        })
    }

    pub fn num_touches(&self) -> usize {
        self.touch.as_ref().map_or(0, |t| t.touches.len())
    }

    pub fn touch_point(&self, index: usize) -> Option<&TouchPoint> {
        self.touch.as_ref()?.touches.get(index)
    }

    pub fn touch_point_mut(&mut self, index: usize) -> Option<&mut TouchPoint> {
        self.touch.as_mut()?.touches.get_mut(index)
    }

    /// Index of the active touch point with `client_id`
    pub fn find_by_client_id(&self, client_id: u32) -> Option<usize> {
        self.touch
            .as_ref()?
            .touches
            .iter()
            .position(|ti| ti.active && ti.client_id == client_id)
    }

    /// Start a protocol touch point for `client_id`, growing the table by
    /// one slot if every slot is in use.
    pub fn begin_touch(&mut self, source_id: u32, client_id: u32, emulate_pointer: bool) -> Result<usize> {
        let device = self.id;
        if self.touch.is_none() {
            return Err(TouchError::NotTouchDevice { device });
        }

        // Only possible once the 32-bit ids wrap around while a touch is held
        if self.find_by_client_id(client_id).is_some() {
            return Err(TouchError::DuplicateClientId { device, client_id });
        }

        let index = match self.touch.as_ref().and_then(|t| t.touches.iter().position(|ti| !ti.active)) {
            Some(index) => index,
            None => {
                let fresh = self.init_touch_point()?;
                let touch = self.touch.as_mut().ok_or(TouchError::NotTouchDevice { device })?;
                touch.touches.try_reserve_exact(1)?;
                touch.touches.push(fresh);
                tracing::debug!("Device {}: touch table grown to {}", device, touch.touches.len());
                touch.touches.len() - 1
            }
        };

        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        ti.active = true;
        ti.client_id = client_id;
        ti.source_id = source_id;
        ti.emulate_pointer = emulate_pointer;
        tracing::trace!("Device {}: touch {} began in slot {}", device, client_id, index);
        Ok(index)
    }

    /// Release a touch point once all of its events have been delivered.
    ///
    /// The pointer-emulating touch also ends its emulated button press and
    /// may release the implicit grab that press started.
    pub fn end_touch(&mut self, index: usize, handler: &mut dyn DeviceStateHandler) -> Result<()> {
        let device = self.id;
        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;

        if ti.emulate_pointer {
            let mut event = TouchEvent::new(TouchEventType::End, device, ti.client_id)
                .with_source(ti.source_id)
                .with_flags(TouchFlags::POINTER_EMULATED | TouchFlags::TOUCH_END);
            event.button = 1;
            handler.emit_emulated_event(device, &event);
            deactivate_active_grab_if_eligible(handler, device);
        }

        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        tracing::trace!("Device {}: touch {} ended (slot {})", device, ti.client_id, index);
        ti.deactivate();
        Ok(())
    }

    /// Tear down a touch point together with its buffers. Only for device
    /// removal: the slot is unusable afterwards.
    pub fn free_touch_point(&mut self, index: usize, handler: &mut dyn DeviceStateHandler) -> Result<()> {
        let active = self
            .touch_point(index)
            .ok_or(TouchError::InvalidTouchIndex(index))?
            .active;
        if active {
            self.end_touch(index, handler)?;
        }

        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        ti.valuators.release();
        ti.sprite.release();
        ti.release_listeners();
        ti.free_history();
        Ok(())
    }
}
