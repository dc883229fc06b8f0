pub mod context;
pub mod errors;
pub mod input;
pub mod runtime;

// Re-export key types
pub use context::{ClientIdAllocator, TouchContext};
pub use errors::TouchError;
pub use runtime::{SignalGuard, SignalMask, WorkQueue};
