//! Touch core configuration.

use crate::core::errors::{Result, TouchError};

/// Sizes and limits for the touch tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchConfig {
    /// Number of events a touch history can hold (one slot is kept as overflow scratch)
    pub history_size: usize,
    /// Initial length of a touch point's sprite trace buffer
    pub sprite_trace_size: usize,
    /// Table size used when a device does not ask for a specific one
    pub default_num_touches: usize,
    /// Size of the device id space
    pub max_devices: usize,
    /// Ids below this are reserved for the virtual core devices
    pub first_device_id: u32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            sprite_trace_size: 32,
            default_num_touches: 5,
            max_devices: 40,
            first_device_id: 2,
        }
    }
}

impl TouchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_size < 2 {
            return Err(TouchError::invalid_config(format!(
                "history_size must be at least 2, got {}",
                self.history_size
            )));
        }
        if self.sprite_trace_size == 0 {
            return Err(TouchError::invalid_config("sprite_trace_size must not be 0"));
        }
        if self.max_devices <= self.first_device_id as usize {
            return Err(TouchError::invalid_config(format!(
                "max_devices ({}) leaves no room above the reserved ids ({})",
                self.max_devices, self.first_device_id
            )));
        }
        Ok(())
    }

    /// Whether `device_id` can be tracked by the resize bitmap
    pub fn is_valid_device_id(&self, device_id: u32) -> bool {
        (device_id as usize) < self.max_devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TouchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_size, 100);
        assert_eq!(config.sprite_trace_size, 32);
    }

    #[test]
    fn test_invalid_configs() {
        let config = TouchConfig { history_size: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(TouchError::InvalidConfig(_))));

        let config = TouchConfig { sprite_trace_size: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = TouchConfig { max_devices: 2, first_device_id: 2, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_id_range() {
        let config = TouchConfig::default();
        assert!(config.is_valid_device_id(2));
        assert!(config.is_valid_device_id(39));
        assert!(!config.is_valid_device_id(40));
    }
}
