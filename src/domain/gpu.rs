//! GPU identification domain types
//!
//! Provides the device id and the descriptive info copied out of device handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-unique GPU identifier assigned by the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Create a new device id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// GPU identification, detached from the native device handle
///
/// Holds no native resources, so it may be freely cloned into sensor records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Unique device id
    pub id: DeviceId,
    /// Display name (e.g., "AMD Radeon RX 7900 XTX")
    pub name: String,
}

impl DeviceInfo {
    /// Create new device info
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)
    }
}
