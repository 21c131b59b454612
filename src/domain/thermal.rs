//! Thermal domain types
//!
//! Provides the temperature type used in metrics snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Temperature(f32);

impl Temperature {
    /// Create a new Temperature
    pub const fn new(celsius: f32) -> Self {
        Self(celsius)
    }

    /// Get the temperature in Celsius
    #[inline]
    pub const fn as_celsius(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}°C", self.0)
    }
}

impl From<u32> for Temperature {
    fn from(value: u32) -> Self {
        Self::new(value as f32)
    }
}

impl From<Temperature> for f32 {
    fn from(temp: Temperature) -> Self {
        temp.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_display() {
        let temp = Temperature::new(65.0);
        assert_eq!(temp.to_string(), "65°C");
    }

    #[test]
    fn test_temperature_comparisons() {
        let t1 = Temperature::new(50.0);
        let t2 = Temperature::new(75.0);
        assert!(t1 < t2);
        assert_eq!(f32::from(t2), 75.0);
    }

    #[test]
    fn test_temperature_from_u32() {
        let temp: Temperature = 65u32.into();
        assert_eq!(temp.as_celsius(), 65.0);
    }
}
