//! Device identity reported by the index endpoint.

use crate::config::{DEVICE_TYPE_HOMEYDUINO, DEVICE_TYPE_UNKNOWN, NAME_MAX_LEN, TYPE_MAX_LEN};
use crate::error::IdentityError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    name: heapless::String<NAME_MAX_LEN>,
    device_type: heapless::String<TYPE_MAX_LEN>,
}

impl Default for DeviceIdentity {
    /// Unconfigured device: empty name, `unknown` type.
    fn default() -> Self {
        let mut device_type = heapless::String::new();
        let _ = device_type.push_str(DEVICE_TYPE_UNKNOWN);
        Self {
            name: heapless::String::new(),
            device_type,
        }
    }
}

impl DeviceIdentity {
    /// Identity with the default `homeyduino` type.
    pub fn new(name: &str) -> Result<Self, IdentityError> {
        let mut id = Self::default();
        id.set_name(name)?;
        id.set_type(DEVICE_TYPE_HOMEYDUINO)?;
        Ok(id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// Replace the name. Leaves the old one in place if `name` is too long.
    pub fn set_name(&mut self, name: &str) -> Result<(), IdentityError> {
        let mut next = heapless::String::new();
        next.push_str(name).map_err(|()| IdentityError::NameTooLong)?;
        self.name = next;
        Ok(())
    }

    /// Replace the type. Leaves the old one in place if `device_type` is too long.
    pub fn set_type(&mut self, device_type: &str) -> Result<(), IdentityError> {
        let mut next = heapless::String::new();
        next.push_str(device_type)
            .map_err(|()| IdentityError::TypeTooLong)?;
        self.device_type = next;
        Ok(())
    }
}
