//! Internal touch events as they travel through the touch core.

use bitflags::bitflags;

use super::valuator::ValuatorMask;

/// Internal touch event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventType {
    Begin,
    Update,
    End,
    /// Ownership change notification; never recorded in a history
    Ownership,
}

impl TouchEventType {
    pub fn name(&self) -> &'static str {
        match self {
            TouchEventType::Begin => "TouchBegin",
            TouchEventType::Update => "TouchUpdate",
            TouchEventType::End => "TouchEnd",
            TouchEventType::Ownership => "TouchOwnership",
        }
    }
}

bitflags! {
    /// Touch event flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TouchFlags: u32 {
        /// The event carries a client id chosen by the server, not a live sample
        const CLIENT_ID = 1 << 3;
        /// The event is being replayed from a touch history
        const REPLAYING = 1 << 4;
        /// The touch drives pointer emulation
        const POINTER_EMULATED = 1 << 5;
        /// The event terminates the touch
        const TOUCH_END = 1 << 6;
    }
}

/// A touch event on a device.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchEventType,
    /// Device the event is routed through
    pub device_id: u32,
    /// Physical device that produced the sample
    pub source_id: u32,
    /// Client-facing touch id
    pub touch_id: u32,
    /// Emulated button (1 for the pointer-emulating touch)
    pub button: u32,
    pub flags: TouchFlags,
    pub root_x: f64,
    pub root_y: f64,
    pub valuators: ValuatorMask,
    pub time: u32,
}

impl TouchEvent {
    pub fn new(kind: TouchEventType, device_id: u32, touch_id: u32) -> Self {
        Self {
            kind,
            device_id,
            source_id: device_id,
            touch_id,
            button: 0,
            flags: TouchFlags::empty(),
            root_x: 0.0,
            root_y: 0.0,
            valuators: ValuatorMask::default(),
            time: 0,
        }
    }

    pub fn with_root(mut self, x: f64, y: f64) -> Self {
        self.root_x = x;
        self.root_y = y;
        self
    }

    pub fn with_flags(mut self, flags: TouchFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_source(mut self, source_id: u32) -> Self {
        self.source_id = source_id;
        self
    }

    /// Attach valuators; axes 0 and 1 also become the root coordinates
    pub fn with_valuators(mut self, valuators: ValuatorMask) -> Self {
        if let Some(x) = valuators.get_double(0) {
            self.root_x = x;
        }
        if let Some(y) = valuators.get_double(1) {
            self.root_y = y;
        }
        self.valuators = valuators;
        self
    }

    /// Build a server-generated event for `touch_id` from a valuator mask
    pub fn synthesize(
        kind: TouchEventType,
        device_id: u32,
        touch_id: u32,
        flags: TouchFlags,
        valuators: ValuatorMask,
    ) -> Self {
        let mut event = Self::new(kind, device_id, touch_id)
            .with_flags(flags)
            .with_valuators(valuators);
        if flags.contains(TouchFlags::POINTER_EMULATED) {
            event.button = 1;
        }
        event
    }

    pub fn is_begin(&self) -> bool {
        self.kind == TouchEventType::Begin
    }

    pub fn is_end(&self) -> bool {
        self.kind == TouchEventType::End
    }

    /// Events the server made up rather than received from a driver
    pub fn is_synthetic(&self) -> bool {
        self.flags.intersects(TouchFlags::CLIENT_ID | TouchFlags::REPLAYING)
    }
}
