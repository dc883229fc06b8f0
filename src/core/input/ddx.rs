//! Driver-facing touch registry.
//!
//! The driver submits samples tagged with its own touch id (the "DDX id"),
//! which it may reuse for later, unrelated touches. On the first sample of
//! a touch a slot is claimed here and a process-unique client id is
//! assigned; later samples with the same DDX id find that slot again until
//! the driver ends the touch.
//!
//! This runs on the driver submission path, so it never allocates. When
//! the table is full the sample is dropped and growth is deferred to the
//! main flow (see `resize`).

use super::device::{InputDevice, TouchMode};
use super::resize::resize_touch_queues;
use super::valuator::ValuatorMask;
use crate::core::errors::{Result, TouchError};
use crate::util::logging::TOUCH;

/// A driver-facing touch slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DdxTouchPoint {
    pub active: bool,
    /// Touch id chosen by the driver
    pub ddx_id: u32,
    /// Client-facing id assigned when the touch began
    pub client_id: u32,
    /// Only the first touch on a direct-touch device emulates the pointer
    pub emulate_pointer: bool,
    pub valuators: ValuatorMask,
}

impl InputDevice {
    /// A fresh, inactive slot for this device
    pub fn init_ddx_touch_point(&self) -> Result<DdxTouchPoint> {
        Ok(DdxTouchPoint {
            valuators: ValuatorMask::try_new(self.num_axes)?,
            ..Default::default()
        })
    }

    pub fn num_ddx_touches(&self) -> usize {
        self.ddx_touches.len()
    }

    pub fn ddx_touch(&self, index: usize) -> Option<&DdxTouchPoint> {
        self.ddx_touches.get(index)
    }

    pub fn ddx_touch_mut(&mut self, index: usize) -> Option<&mut DdxTouchPoint> {
        self.ddx_touches.get_mut(index)
    }

    /// Index of the active slot for `ddx_id`
    pub fn active_ddx_touch(&self, ddx_id: u32) -> Option<usize> {
        self.touch.as_ref()?;
        self.ddx_touches
            .iter()
            .position(|ti| ti.active && ti.ddx_id == ddx_id)
    }

    /// Find the active slot for `ddx_id`, optionally starting a new touch
    /// if there is none.
    pub fn find_by_ddx_id(&mut self, ddx_id: u32, create: bool) -> Option<usize> {
        if let Some(index) = self.active_ddx_touch(ddx_id) {
            return Some(index);
        }
        if !create {
            return None;
        }
        self.begin_ddx_touch(ddx_id).ok()
    }

    /// Claim a slot for a new driver touch and assign its client id.
    ///
    /// Fails if `ddx_id` is already active or the table is full. A full
    /// table schedules the deferred resize for this device.
    pub fn begin_ddx_touch(&mut self, ddx_id: u32) -> Result<usize> {
        debug_assert!(
            !self.ctx.signals.is_blocked(),
            "driver touch registered while input signals are blocked"
        );
        let device = self.id;
        let Some(mode) = self.touch_mode() else {
            return Err(TouchError::NotTouchDevice { device });
        };

        // DDX touch ids must be unique among active slots
        if self.active_ddx_touch(ddx_id).is_some() {
            return Err(TouchError::DuplicateDdxId { device, ddx_id });
        }

        let mut emulate_pointer = mode == TouchMode::Direct;
        let mut free = None;
        for (i, ti) in self.ddx_touches.iter().enumerate() {
            // Only emulate pointer events on the first touch
            if ti.active {
                emulate_pointer = false;
            } else if free.is_none() {
                free = Some(i);
            }

            if !emulate_pointer && free.is_some() {
                break;
            }
        }

        if let Some(index) = free {
            let client_id = self.ctx.client_ids.next_id();
            let ti = &mut self.ddx_touches[index];
            ti.active = true;
            ti.ddx_id = ddx_id;
            ti.client_id = client_id;
            ti.emulate_pointer = emulate_pointer;
            ti.valuators.zero();
            tracing::trace!(
                "Device {}: ddx touch {} -> client id {} (slot {}, emulate {})",
                device,
                ddx_id,
                client_id,
                index,
                emulate_pointer
            );
            return Ok(index);
        }

        // Out of slots: drop this sample and let the main flow grow the table
        let capacity = self.ddx_touches.len();
        crate::wlog!(
            TOUCH,
            "{}: not enough space for touch events (max {} touchpoints). Dropping this event.",
            self.name,
            capacity
        );
        tracing::error!(
            "Device {} ({}): touch table full at {} slots, dropping ddx touch {}",
            device,
            self.name,
            capacity,
            ddx_id
        );
        if !self.ctx.resize_waiting.test_and_set(device) {
            self.ctx.work.push(Box::new(resize_touch_queues));
        }

        Err(TouchError::CapacityExhausted { device, capacity })
    }

    /// Release the slot. Its valuators are reset when the slot is reused.
    pub fn end_ddx_touch(&mut self, index: usize) {
        if self.touch.is_none() {
            return;
        }
        if let Some(ti) = self.ddx_touches.get_mut(index) {
            tracing::trace!("Device {}: ddx touch {} ended (slot {})", self.id, ti.ddx_id, index);
            ti.active = false;
        }
    }
}
