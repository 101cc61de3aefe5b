//! Domain data structures for providers, readings, and aggregate results.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::PortError;

const CELSIUS_OFFSET: f64 = 273.15;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier tag of a provider implementation.
pub struct ProviderId(pub String);

impl ProviderId {
    /// Build an identifier from any string-like tag.
    #[must_use]
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self(tag.into())
    }

    /// The raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
/// Absolute temperature, the unit every provider normalizes to.
pub struct Kelvin(f64);

impl Kelvin {
    /// Wrap a raw Kelvin value without checking it.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Wrap a raw Kelvin value, rejecting anything that cannot be a real reading.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Implausible`] for non-finite values or values below absolute zero.
    pub fn checked(value: f64) -> Result<Self, PortError> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(PortError::Implausible(value))
        }
    }

    /// Convert a Celsius reading.
    #[must_use]
    pub fn from_celsius(celsius: f64) -> Self {
        Self(celsius + CELSIUS_OFFSET)
    }

    /// Convert a Fahrenheit reading.
    #[must_use]
    pub fn from_fahrenheit(fahrenheit: f64) -> Self {
        Self(((fahrenheit - 32.0) / 9.0) * 5.0 + CELSIUS_OFFSET)
    }

    /// The raw value in Kelvin.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// The same temperature in Celsius.
    #[must_use]
    pub fn to_celsius(self) -> f64 {
        self.0 - CELSIUS_OFFSET
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2}K", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic position used by providers that query by location.
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Outcome of one successful aggregation.
pub struct AggregateResult {
    /// Arithmetic mean of every provider's reading.
    pub mean: Kelvin,
    /// Wall-clock time spent fanning out and collecting.
    pub elapsed: Duration,
    /// Number of readings that went into the mean.
    pub providers: usize,
}
