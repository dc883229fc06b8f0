//! Core error types

use std::collections::TryReserveError;

use thiserror::Error;

/// Touch core errors
///
/// None of these are fatal: the caller drops the event that triggered the
/// failure and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TouchError {
    #[error("Device {0} does not exist")]
    UnknownDevice(u32),

    #[error("Device {device} has no touch class")]
    NotTouchDevice { device: u32 },

    #[error("Device {device}: driver touch id {ddx_id} is already active")]
    DuplicateDdxId { device: u32, ddx_id: u32 },

    #[error("Device {device}: client touch id {client_id} is already active")]
    DuplicateClientId { device: u32, client_id: u32 },

    #[error("Device {device}: not enough space for touch events (max {capacity} touchpoints)")]
    CapacityExhausted { device: u32, capacity: usize },

    #[error("Allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),

    #[error("Device {device}: no sprite trace available to copy")]
    MissingSpriteSource { device: u32 },

    #[error("Sprite trace is empty")]
    EmptySpriteTrace,

    #[error("Invalid touch index: {0}")]
    InvalidTouchIndex(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("At least one screen is required")]
    NoScreens,
}

impl TouchError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the condition heals itself once the deferred growth task ran.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. } | Self::AllocationFailed(_))
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, TouchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(TouchError::CapacityExhausted { device: 2, capacity: 5 }.is_transient());
        assert!(!TouchError::DuplicateDdxId { device: 2, ddx_id: 1 }.is_transient());
        assert!(!TouchError::NotTouchDevice { device: 2 }.is_transient());
        assert!(!TouchError::invalid_config("bad").is_transient());
    }
}
