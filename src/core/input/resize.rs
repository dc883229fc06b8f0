//! Deferred growth of the driver-facing touch tables.
//!
//! The driver path cannot allocate, so when it runs out of slots it only
//! sets the device's bit in [`ResizeWaiting`] and queues
//! [`resize_touch_queues`]. The task runs later on the main flow with input
//! signals blocked and grows every flagged table by half.

use std::sync::atomic::{AtomicU8, Ordering};

use super::device::{DeviceRegistry, InputDevice};
use crate::core::errors::Result;

/// One "resize needed" bit per device id
#[derive(Debug)]
pub struct ResizeWaiting {
    bits: Box<[AtomicU8]>,
}

impl ResizeWaiting {
    pub fn new(max_devices: usize) -> Self {
        Self {
            bits: (0..max_devices.div_ceil(8)).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    fn locate(&self, device_id: u32) -> Option<(&AtomicU8, u8)> {
        let id = device_id as usize;
        self.bits.get(id / 8).map(|byte| (byte, 1u8 << (id % 8)))
    }

    /// Set the bit and return whether it was already set.
    /// Ids outside the bitmap report as already set so nothing gets queued.
    pub fn test_and_set(&self, device_id: u32) -> bool {
        match self.locate(device_id) {
            Some((byte, bit)) => byte.fetch_or(bit, Ordering::AcqRel) & bit != 0,
            None => true,
        }
    }

    pub fn is_set(&self, device_id: u32) -> bool {
        self.locate(device_id)
            .map(|(byte, bit)| byte.load(Ordering::Acquire) & bit != 0)
            .unwrap_or(false)
    }

    pub fn clear(&self, device_id: u32) {
        if let Some((byte, bit)) = self.locate(device_id) {
            byte.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// Whether any device is waiting
    pub fn any(&self) -> bool {
        self.bits.iter().any(|b| b.load(Ordering::Acquire) != 0)
    }
}

impl InputDevice {
    /// Grow the driver-facing table to `n + n/2 + 1` slots.
    ///
    /// Existing slots keep their index and contents; new slots are fresh and
    /// inactive. On allocation failure the table is left untouched. Returns
    /// the new size.
    pub fn grow_ddx_touches(&mut self) -> Result<usize> {
        let current = self.ddx_touches.len();
        let size = current + current / 2 + 1;

        let mut fresh = Vec::new();
        fresh.try_reserve_exact(size - current)?;
        for _ in current..size {
            fresh.push(self.init_ddx_touch_point()?);
        }

        self.ddx_touches.try_reserve_exact(fresh.len())?;
        self.ddx_touches.append(&mut fresh);
        Ok(size)
    }
}

/// Work proc: grow the touch table of every device flagged in the
/// resize bitmap.
///
/// Always reports done. A failed grow leaves the device as it was; the next
/// time its table runs full the bit is set again.
pub fn resize_touch_queues(registry: &mut DeviceRegistry) -> bool {
    let ctx = registry.context().clone();
    let _signals = ctx.signals.block();

    for id in ctx.config.first_device_id..ctx.config.max_devices as u32 {
        if !ctx.resize_waiting.is_set(id) {
            continue;
        }
        ctx.resize_waiting.clear(id);

        // The device may have gone away since it asked
        let Some(device) = registry.get_mut(id) else {
            tracing::debug!("Device {} removed before its touch table could grow", id);
            continue;
        };

        let old = device.num_ddx_touches();
        match device.grow_ddx_touches() {
            Ok(size) => tracing::info!(
                "Device {} ({}): touch table grown from {} to {} slots",
                id,
                device.name,
                old,
                size
            ),
            Err(e) => tracing::warn!("Device {} ({}): failed to grow touch table: {}", id, device.name, e),
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::TouchConfig;
    use crate::core::context::TouchContext;
    use crate::core::input::device::TouchMode;
    use crate::core::input::sprite::{Screen, WindowId};

    #[test]
    fn test_bitmap_test_and_set() {
        let waiting = ResizeWaiting::new(40);
        assert!(!waiting.any());
        assert!(!waiting.test_and_set(9));
        assert!(waiting.test_and_set(9));
        assert!(waiting.is_set(9));
        assert!(!waiting.is_set(8));
        assert!(!waiting.is_set(10));

        waiting.clear(9);
        assert!(!waiting.is_set(9));
        assert!(!waiting.any());
    }

    #[test]
    fn test_grow_keeps_slots_and_sizes_new_masks() {
        let ctx = TouchContext::new(TouchConfig::default(), vec![Screen::new(0, WindowId(1))]).unwrap();
        let mut dev = InputDevice::new(Arc::new(ctx), 2, "pen", 3);
        dev.init_touch_class(TouchMode::Direct, Some(2)).unwrap();

        let slot = dev.begin_ddx_touch(42).unwrap();
        assert_eq!(dev.grow_ddx_touches().unwrap(), 4);

        let kept = dev.ddx_touch(slot).unwrap();
        assert!(kept.active);
        assert_eq!(kept.ddx_id, 42);
        for index in 2..4 {
            let fresh = dev.ddx_touch(index).unwrap();
            assert!(!fresh.active);
            assert_eq!(fresh.valuators.size(), 3);
            assert_eq!(fresh.valuators.num_set(), 0);
        }
    }

    #[test]
    fn test_bitmap_out_of_range() {
        let waiting = ResizeWaiting::new(16);
        assert!(waiting.test_and_set(16));
        assert!(!waiting.is_set(16));
        waiting.clear(100);
        assert!(!waiting.any());
    }
}
