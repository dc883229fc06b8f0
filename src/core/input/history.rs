//! Touch event history and replay.
//!
//! When a grab owner rejects a touch, the next listener in line becomes the
//! owner without having seen any of the touch so far. The history keeps the
//! TouchBegin and the TouchUpdates of the touch so they can be replayed to
//! the new owner.

use super::callbacks::EventSink;
use super::device::InputDevice;
use super::event::{TouchEvent, TouchEventType, TouchFlags};
use super::touch::TouchPoint;
use super::valuator::ValuatorMask;
use crate::core::errors::{Result, TouchError};

/// Default number of slots in a touch history
pub const TOUCH_HISTORY_SIZE: usize = 100;

/// Smallest usable history: the TouchBegin plus the overflow slot
pub const MIN_HISTORY_SIZE: usize = 2;

/// Recorded events of one touch: at most one TouchBegin, then TouchUpdates.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchHistory {
    events: Vec<TouchEvent>,
    size: usize,
    dropped: u64,
}

impl TouchHistory {
    pub fn try_with_capacity(size: usize) -> Result<Self> {
        if size < MIN_HISTORY_SIZE {
            return Err(TouchError::invalid_config(format!(
                "history size must be at least {}, got {}",
                MIN_HISTORY_SIZE, size
            )));
        }
        let mut events = Vec::new();
        events.try_reserve_exact(size)?;
        Ok(Self { events, size, dropped: 0 })
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    pub fn events(&self) -> &[TouchEvent] {
        &self.events
    }

    /// Events refused because the history was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TouchPoint {
    /// Allocate the history. A touch that already has one keeps it.
    pub fn allocate_history(&mut self, size: usize) -> Result<()> {
        if self.history.is_none() {
            self.history = Some(TouchHistory::try_with_capacity(size)?);
        }
        Ok(())
    }

    pub fn free_history(&mut self) {
        self.history = None;
    }

    pub fn history_elements(&self) -> usize {
        self.history.as_ref().map_or(0, TouchHistory::len)
    }

    /// Record `event` if this touch keeps a history.
    ///
    /// Only live events are kept: one TouchBegin followed by TouchUpdates.
    /// Once the history is full newer events are dropped.
    pub fn push_history(&mut self, event: &TouchEvent) {
        let (source_id, client_id) = (self.source_id, self.client_id);
        let Some(history) = self.history.as_mut() else {
            return;
        };

        match event.kind {
            // A repeated TouchBegin is ignored
            TouchEventType::Begin if !history.events.is_empty() => return,
            TouchEventType::Begin | TouchEventType::Update => {}
            TouchEventType::End | TouchEventType::Ownership => return,
        }

        if event.is_synthetic() {
            return;
        }

        // The last slot stays free; a full history drops the newest event
        if history.events.len() >= history.size.saturating_sub(1) {
            history.dropped += 1;
            tracing::debug!(
                "source device {}: history size {} overflowing for touch {}",
                source_id,
                history.size,
                client_id
            );
            return;
        }
        history.events.push(event.clone());
    }

    /// Replay the history to `resource`: a synthetic TouchBegin built from
    /// the recorded begin, then every later event in order. Returns the
    /// number of events delivered.
    pub fn replay_history(&self, device_id: u32, resource: u32, sink: &mut dyn EventSink) -> usize {
        let Some(first) = self.history.as_ref().and_then(|h| h.events.first()) else {
            return 0;
        };

        let mut mask = ValuatorMask::new(0);
        mask.set_double(0, first.valuators.get_double(0).unwrap_or(first.root_x));
        mask.set_double(1, first.valuators.get_double(1).unwrap_or(first.root_y));

        let mut flags = TouchFlags::CLIENT_ID | TouchFlags::REPLAYING;
        if self.emulate_pointer {
            flags |= TouchFlags::POINTER_EMULATED;
        }
        let begin = TouchEvent::synthesize(TouchEventType::Begin, device_id, self.client_id, flags, mask)
            .with_source(self.source_id);
        sink.deliver(resource, begin);

        let mut delivered = 1;
        // The recorded begin was replaced by the synthetic one above
        for event in self.history.iter().flat_map(|h| h.events.iter().skip(1)) {
            sink.deliver(resource, event.clone().with_flags(TouchFlags::REPLAYING));
            delivered += 1;
        }

        tracing::debug!(
            "Device {}: replayed {} events of touch {} to resource {:#x}",
            device_id,
            delivered,
            self.client_id,
            resource
        );
        delivered
    }
}

impl InputDevice {
    /// Allocate the history of touch `index` with the configured size
    pub fn allocate_touch_history(&mut self, index: usize) -> Result<()> {
        let size = self.ctx.config.history_size;
        let ti = self.touch_point_mut(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        ti.allocate_history(size)?;
        Ok(())
    }

    /// Replay the history of touch `index` to a new owner
    pub fn replay_touch_history(&self, index: usize, resource: u32, sink: &mut dyn EventSink) -> Result<usize> {
        let ti = self.touch_point(index).ok_or(TouchError::InvalidTouchIndex(index))?;
        Ok(ti.replay_history(self.id, resource, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::callbacks::VecEventSink;

    fn touch_with_history() -> TouchPoint {
        let mut ti = TouchPoint {
            active: true,
            client_id: 7,
            source_id: 3,
            ..Default::default()
        };
        ti.allocate_history(TOUCH_HISTORY_SIZE).unwrap();
        ti
    }

    fn update(x: f64) -> TouchEvent {
        TouchEvent::new(TouchEventType::Update, 2, 7).with_root(x, x)
    }

    #[test]
    fn test_allocate_rejects_tiny_history() {
        let mut ti = TouchPoint::default();
        assert!(matches!(ti.allocate_history(0), Err(TouchError::InvalidConfig(_))));
        assert!(ti.allocate_history(1).is_err());
        assert!(ti.history.is_none());

        // Pushing without a history is a no-op
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        assert_eq!(ti.history_elements(), 0);
    }

    #[test]
    fn test_smallest_history_keeps_only_the_begin() {
        let mut ti = TouchPoint::default();
        ti.allocate_history(MIN_HISTORY_SIZE).unwrap();
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        ti.push_history(&update(1.0));
        assert_eq!(ti.history_elements(), 1);
        assert_eq!(ti.history.as_ref().unwrap().dropped(), 1);
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let mut ti = touch_with_history();
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        ti.allocate_history(TOUCH_HISTORY_SIZE).unwrap();
        assert_eq!(ti.history_elements(), 1);

        ti.free_history();
        assert!(ti.history.is_none());
        assert_eq!(ti.history_elements(), 0);
        ti.free_history();
    }

    #[test]
    fn test_push_without_history_is_noop() {
        let mut ti = TouchPoint::default();
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        assert!(ti.history.is_none());
    }

    #[test]
    fn test_history_filters_events() {
        let mut ti = touch_with_history();

        ti.push_history(&update(1.0));
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        ti.push_history(&TouchEvent::new(TouchEventType::End, 2, 7));
        ti.push_history(&TouchEvent::new(TouchEventType::Ownership, 2, 7));
        ti.push_history(&update(2.0).with_flags(TouchFlags::REPLAYING));
        ti.push_history(&update(3.0).with_flags(TouchFlags::CLIENT_ID));
        ti.push_history(&update(4.0).with_flags(TouchFlags::POINTER_EMULATED));

        let events = ti.history.as_ref().unwrap().events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].root_x, 1.0);
        assert_eq!(events[1].root_x, 4.0);
    }

    #[test]
    fn test_history_overflow_drops_newest() {
        let mut ti = touch_with_history();
        ti.push_history(&TouchEvent::new(TouchEventType::Begin, 2, 7));
        for i in 0..150 {
            ti.push_history(&update(i as f64));
        }

        let history = ti.history.as_ref().unwrap();
        assert_eq!(history.len(), TOUCH_HISTORY_SIZE - 1);
        assert_eq!(history.dropped(), 52);
        assert_eq!(history.events().last().unwrap().root_x, 97.0);
    }

    #[test]
    fn test_replay_empty_history() {
        let ti = touch_with_history();
        let mut sink = VecEventSink::default();
        assert_eq!(ti.replay_history(2, 0x400001, &mut sink), 0);
        assert!(sink.events.is_empty());
    }
}
