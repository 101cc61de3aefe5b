//! Provider implementation using the `OpenWeatherMap` current weather API.
//!
//! The same endpoint also reports the city's coordinates, so this crate doubles as the
//! coordinate lookup for providers that can only be queried by location.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use kelvin_core::{
    http::fetch_json,
    model::{Coordinates, Kelvin, ProviderId},
    ports::{CoordinatePort, PortError, TemperaturePort},
};

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";
/// Tag used for this provider.
pub const PROVIDER_TAG: &str = "openweathermap";

/// Response from /data/2.5/weather
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: Option<Main>,
    coord: Option<Coord>,
}

#[derive(Debug, Deserialize)]
struct Main {
    // Kelvin unless a `units` parameter is sent, which we never do.
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Thin client for the current weather endpoint.
#[derive(Clone)]
pub struct OpenWeatherMapApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherMapApi {
    /// Create a client against the public API.
    #[must_use]
    pub fn new<K: Into<String>>(client: Client, api_key: K) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a custom host, e.g. a proxy or mock server.
    #[must_use]
    pub fn with_base_url<U: Into<String>, K: Into<String>>(
        client: Client,
        base_url: U,
        api_key: K,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    async fn current(&self, city: &str) -> Result<CurrentWeather, PortError> {
        let req = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[("APPID", self.api_key.as_str()), ("q", city)]);

        fetch_json::<CurrentWeather>(req).await
    }
}

/// Temperature provider for `OpenWeatherMap`.
pub struct OpenWeatherMapProvider {
    api: OpenWeatherMapApi,
    id: ProviderId,
}

impl OpenWeatherMapProvider {
    /// Create a provider on top of the given API client.
    #[must_use]
    pub fn new(api: OpenWeatherMapApi) -> Self {
        Self {
            api,
            id: ProviderId::new(PROVIDER_TAG),
        }
    }
}

#[async_trait]
impl TemperaturePort for OpenWeatherMapProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, PortError> {
        let weather = self.api.current(city).await?;

        let raw = weather
            .main
            .and_then(|main| main.temp)
            .ok_or(PortError::DataMissing("main.temp"))?;
        let kelvin = Kelvin::checked(raw)?;

        info!(provider = PROVIDER_TAG, city, %kelvin, "reading resolved");
        Ok(kelvin)
    }
}

/// City to coordinates lookup backed by the same endpoint.
pub struct OpenWeatherMapGeocoder {
    api: OpenWeatherMapApi,
}

impl OpenWeatherMapGeocoder {
    /// Create a geocoder on top of the given API client.
    #[must_use]
    pub fn new(api: OpenWeatherMapApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CoordinatePort for OpenWeatherMapGeocoder {
    async fn coordinates(&self, city: &str) -> Result<Coordinates, PortError> {
        let weather = self.api.current(city).await?;

        let coord = weather.coord.ok_or(PortError::DataMissing("coord"))?;
        let lat = coord.lat.ok_or(PortError::DataMissing("coord.lat"))?;
        let lon = coord.lon.ok_or(PortError::DataMissing("coord.lon"))?;

        Ok(Coordinates { lat, lon })
    }
}

/// Build the temperature provider for `OpenWeatherMap`.
#[must_use]
pub fn provider(api: OpenWeatherMapApi) -> Arc<dyn TemperaturePort> {
    Arc::new(OpenWeatherMapProvider::new(api))
}

/// Build the coordinate lookup for `OpenWeatherMap`.
#[must_use]
pub fn geocoder(api: OpenWeatherMapApi) -> Arc<dyn CoordinatePort> {
    Arc::new(OpenWeatherMapGeocoder::new(api))
}
