//! Traits describing provider capabilities and their error type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{Coordinates, Kelvin, ProviderId};

#[derive(thiserror::Error, Debug)]
/// Errors a provider can return instead of a reading.
pub enum PortError {
    /// Upstream could not be reached or answered with a failure status.
    #[error("Provider unavailable: {0}")]
    Unavailable(#[from] ReqwestError),
    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// Response parsed but lacked a required field.
    #[error("Missing data: {0}")]
    DataMissing(&'static str),
    /// Resolving the city to coordinates failed before the reading was requested.
    #[error("Coordinate lookup failed: {0}")]
    Geocoding(#[source] Box<PortError>),
    /// Provider did not answer within the configured deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// Provider produced a value that cannot be a temperature.
    #[error("Implausible reading: {0}")]
    Implausible(f64),
}

#[async_trait]
/// A single upstream temperature source.
pub trait TemperaturePort: Send + Sync {
    /// Tag identifying the implementation.
    fn id(&self) -> &ProviderId;

    /// Measure the current temperature for a city.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] whenever no trustworthy reading is available.
    async fn temperature(&self, city: &str) -> Result<Kelvin, PortError>;
}

#[async_trait]
/// Resolves a city name to a position, for providers that query by location.
pub trait CoordinatePort: Send + Sync {
    /// Look up the coordinates of a city.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the lookup fails or the city is unknown.
    async fn coordinates(&self, city: &str) -> Result<Coordinates, PortError>;
}
