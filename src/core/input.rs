//! Touch input: driver slots, protocol touch points, sprite traces and
//! touch history.

pub mod callbacks;
pub mod ddx;
pub mod device;
pub mod event;
pub mod history;
pub mod resize;
pub mod sprite;
pub mod touch;
pub mod valuator;


pub use callbacks::{DeviceStateHandler, EventSink, WindowPicker};
pub use ddx::DdxTouchPoint;
pub use device::{DeviceRegistry, InputDevice, TouchClass, TouchMode};
pub use event::{TouchEvent, TouchEventType, TouchFlags};
pub use history::{TouchHistory, MIN_HISTORY_SIZE, TOUCH_HISTORY_SIZE};
pub use sprite::{Screen, SpriteTrace, WindowId};
pub use touch::{ListenerKind, TouchListener, TouchPoint};
pub use valuator::ValuatorMask;
