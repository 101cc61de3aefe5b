//! Provider implementation using the Dark Sky forecast API.
//!
//! Dark Sky is queried by position only, so every reading first resolves the city through
//! a [`CoordinatePort`] and then asks for the current conditions at that point.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use kelvin_core::{
    http::fetch_json,
    model::{Coordinates, Kelvin, ProviderId},
    ports::{CoordinatePort, PortError, TemperaturePort},
};

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "https://api.darksky.net";
/// Tag used for this provider.
pub const PROVIDER_TAG: &str = "darksky";

/// Response from /forecast/{key}/{lat},{lon}
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    currently: Option<Currently>,
    // hourly / daily blocks exist as well, we only need the current reading
}

#[derive(Debug, Deserialize)]
struct Currently {
    // Fahrenheit, the API default for unit-less requests.
    temperature: Option<f64>,
}

/// Temperature provider for Dark Sky.
pub struct DarkSkyProvider {
    client: Client,
    base_url: String,
    api_key: String,
    geocoder: Arc<dyn CoordinatePort>,
    id: ProviderId,
}

impl DarkSkyProvider {
    /// Create a provider against the public API.
    #[must_use]
    pub fn new<K: Into<String>>(
        client: Client,
        api_key: K,
        geocoder: Arc<dyn CoordinatePort>,
    ) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, api_key, geocoder)
    }

    /// Create a provider against a custom host, e.g. a proxy or mock server.
    #[must_use]
    pub fn with_base_url<U: Into<String>, K: Into<String>>(
        client: Client,
        base_url: U,
        api_key: K,
        geocoder: Arc<dyn CoordinatePort>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            geocoder,
            id: ProviderId::new(PROVIDER_TAG),
        }
    }

    async fn forecast(&self, at: Coordinates) -> Result<ForecastResponse, PortError> {
        let req = self.client.get(format!(
            "{}/forecast/{}/{:.2},{:.2}",
            self.base_url, self.api_key, at.lat, at.lon
        ));

        fetch_json::<ForecastResponse>(req).await
    }
}

#[async_trait]
impl TemperaturePort for DarkSkyProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, PortError> {
        let at = self
            .geocoder
            .coordinates(city)
            .await
            .map_err(|err| PortError::Geocoding(Box::new(err)))?;
        debug!(provider = PROVIDER_TAG, city, lat = at.lat, lon = at.lon, "coordinates resolved");

        let fahrenheit = self
            .forecast(at)
            .await?
            .currently
            .and_then(|currently| currently.temperature)
            .ok_or(PortError::DataMissing("currently.temperature"))?;
        let kelvin = Kelvin::checked(Kelvin::from_fahrenheit(fahrenheit).value())?;

        info!(provider = PROVIDER_TAG, city, %kelvin, "reading resolved");
        Ok(kelvin)
    }
}
