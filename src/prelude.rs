//! Common imports and types used throughout the touch core.

pub use std::sync::Arc;

pub use crate::core::context::TouchContext;
pub use crate::core::errors::TouchError;
pub use crate::core::input::device::{DeviceRegistry, InputDevice, TouchMode};
pub use crate::core::input::event::{TouchEvent, TouchEventType, TouchFlags};

pub type Result<T> = std::result::Result<T, crate::core::errors::TouchError>;
