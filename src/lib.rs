// Wawona Compositor
// Copyright (c) 2026
//
// Touch-point tracking for the compositor input stack: driver touch slots,
// protocol touch points, sprite-trace resolution and touch history replay.

pub mod config;
pub mod core;
pub mod prelude;
pub mod util;

pub use config::TouchConfig;
pub use crate::core::errors::{Result, TouchError};
pub use crate::core::input::{DeviceRegistry, InputDevice, TouchEvent, TouchEventType, TouchFlags, TouchMode};
pub use crate::core::TouchContext;
