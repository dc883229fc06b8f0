//! Input devices and the registry that owns them.
//!
//! Each touch-capable device carries two tables:
//! - `ddx_touches`: driver-facing slots, keyed by the driver's touch id.
//!   Written from the driver submission path, grown only by the deferred
//!   resize task.
//! - `touch.touches`: protocol-facing touch points, keyed by client id.
//!   Main flow only, grown on demand.
//!
//! Slots in both tables are addressed by index and never removed; they are
//! deactivated and reused.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::callbacks::DeviceStateHandler;
use super::ddx::DdxTouchPoint;
use super::sprite::SpriteTrace;
use super::touch::TouchPoint;
use crate::core::context::TouchContext;
use crate::core::errors::{Result, TouchError};

/// How touches are routed to windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    /// Touchscreen: every touch is hit-tested where it lands
    Direct,
    /// Touchpad: touches follow the device's pointer
    Dependent,
}

/// Protocol-facing touch state of a device
#[derive(Debug)]
pub struct TouchClass {
    pub mode: TouchMode,
    pub touches: Vec<TouchPoint>,
}

/// A device as seen by the touch core
#[derive(Debug)]
pub struct InputDevice {
    pub id: u32,
    pub name: String,
    /// Number of valuator axes; sizes every valuator mask of this device
    pub num_axes: usize,
    /// `None` for devices without touch capability
    pub touch: Option<TouchClass>,
    /// Driver-facing touch slots
    pub ddx_touches: Vec<DdxTouchPoint>,
    /// The device's pointer sprite, if it has a cursor
    pub pointer_sprite: Option<SpriteTrace>,
    pub(crate) ctx: Arc<TouchContext>,
}

impl InputDevice {
    pub fn new(ctx: Arc<TouchContext>, id: u32, name: impl Into<String>, num_axes: usize) -> Self {
        Self {
            id,
            name: name.into(),
            num_axes,
            touch: None,
            ddx_touches: Vec::new(),
            pointer_sprite: None,
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<TouchContext> {
        &self.ctx
    }

    /// Give the device a touch class with `num_touches` slots in both tables.
    /// `None` uses the configured default.
    pub fn init_touch_class(&mut self, mode: TouchMode, num_touches: Option<usize>) -> Result<()> {
        let num_touches = num_touches.unwrap_or(self.ctx.config.default_num_touches);
        let mut ddx_touches = Vec::new();
        ddx_touches.try_reserve_exact(num_touches)?;
        for _ in 0..num_touches {
            ddx_touches.push(self.init_ddx_touch_point()?);
        }

        let mut touches = Vec::new();
        touches.try_reserve_exact(num_touches)?;
        for _ in 0..num_touches {
            touches.push(self.init_touch_point()?);
        }

        self.ddx_touches = ddx_touches;
        self.touch = Some(TouchClass { mode, touches });
        tracing::debug!(
            "Device {} ({}): touch class {:?} with {} touches",
            self.id,
            self.name,
            mode,
            num_touches
        );
        Ok(())
    }

    pub fn is_touch_device(&self) -> bool {
        self.touch.is_some()
    }

    pub fn touch_mode(&self) -> Option<TouchMode> {
        self.touch.as_ref().map(|t| t.mode)
    }

    /// Tear down every protocol-facing touch point
    pub fn free_touch_points(&mut self, handler: &mut dyn DeviceStateHandler) {
        let count = self.num_touches();
        for index in 0..count {
            if let Err(e) = self.free_touch_point(index, handler) {
                tracing::warn!("Device {} ({}): failed to free touch {}: {}", self.id, self.name, index, e);
            }
        }
    }
}

// ============================================================================
// Device Registry
// ============================================================================

/// Owns every device known to the touch core
#[derive(Debug)]
pub struct DeviceRegistry {
    ctx: Arc<TouchContext>,
    devices: BTreeMap<u32, InputDevice>,
}

impl DeviceRegistry {
    pub fn new(ctx: Arc<TouchContext>) -> Self {
        Self {
            ctx,
            devices: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<TouchContext> {
        &self.ctx
    }

    /// Register a device under the lowest free non-reserved id
    pub fn add_device(&mut self, name: impl Into<String>, num_axes: usize) -> Result<u32> {
        let config = &self.ctx.config;
        let id = (config.first_device_id..)
            .take_while(|id| config.is_valid_device_id(*id))
            .find(|id| !self.devices.contains_key(id))
            .ok_or_else(|| {
                TouchError::invalid_config(format!("device limit of {} reached", config.max_devices))
            })?;

        let device = InputDevice::new(self.ctx.clone(), id, name, num_axes);
        tracing::info!("Added device {} ({})", id, device.name);
        self.devices.insert(id, device);
        Ok(id)
    }

    /// Remove a device, releasing all of its touch points
    pub fn remove_device(&mut self, id: u32, handler: &mut dyn DeviceStateHandler) -> Option<InputDevice> {
        let mut device = self.devices.remove(&id)?;
        device.free_touch_points(handler);
        tracing::info!("Removed device {} ({})", id, device.name);
        Some(device)
    }

    pub fn get(&self, id: u32) -> Option<&InputDevice> {
        self.devices.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut InputDevice> {
        self.devices.get_mut(&id)
    }

    pub fn device(&mut self, id: u32) -> Result<&mut InputDevice> {
        self.devices.get_mut(&id).ok_or(TouchError::UnknownDevice(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.devices.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Run queued work procs; procs that are not done stay queued
    pub fn process_work_queue(&mut self) -> usize {
        let procs = self.ctx.work.take_all();
        let ran = procs.len();
        for mut work in procs {
            if !work(self) {
                self.ctx.work.push(work);
            }
        }
        ran
    }
}
