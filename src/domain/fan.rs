//! Fan-related domain types
//!
//! Provides validated types for fan duty and fan speed readings.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fan duty cycle percentage (0-100)
///
/// Validated on construction to ensure the value is within valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FanDuty(u8);

impl FanDuty {
    /// Minimum valid duty
    pub const MIN: u8 = 0;
    /// Maximum valid duty
    pub const MAX: u8 = 100;

    /// Create a new FanDuty with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFanDuty` if value > 100
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::InvalidFanDuty(value as f32));
        }
        Ok(Self(value))
    }

    /// Create a FanDuty from a host-supplied percentage
    ///
    /// Fractional values are rounded to the nearest whole percent.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFanDuty` if the value is not finite or
    /// falls outside 0-100 after rounding
    pub fn from_percent(value: f32) -> Result<Self, DomainError> {
        let rounded = value.round();
        if !rounded.is_finite() || rounded < Self::MIN as f32 || rounded > Self::MAX as f32 {
            return Err(DomainError::InvalidFanDuty(value));
        }
        Ok(Self(rounded as u8))
    }

    /// Create a FanDuty from a raw reading, clamping out-of-range values
    pub fn saturating(value: u32) -> Self {
        Self(value.min(Self::MAX as u32) as u8)
    }

    /// Get the duty as a percentage value (0-100)
    #[inline]
    pub const fn as_percentage(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for FanDuty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for FanDuty {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FanDuty> for u8 {
    fn from(duty: FanDuty) -> Self {
        duty.0
    }
}

impl From<FanDuty> for u32 {
    fn from(duty: FanDuty) -> Self {
        duty.0 as u32
    }
}

/// Fan rotational speed in revolutions per minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FanRpm(u32);

impl FanRpm {
    /// Create a new fan speed reading
    pub const fn new(rpm: u32) -> Self {
        Self(rpm)
    }

    /// Get the speed in RPM
    #[inline]
    pub const fn as_rpm(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FanRpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} RPM", self.0)
    }
}

impl From<u32> for FanRpm {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}
