//! Provider implementation using the Weather Underground conditions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use kelvin_core::{
    http::fetch_json,
    model::{Kelvin, ProviderId},
    ports::{PortError, TemperaturePort},
};

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "http://api.wunderground.com";
/// Tag used for this provider.
pub const PROVIDER_TAG: &str = "wunderground";

/// Response from /api/{key}/conditions/q/{city}.json
#[derive(Debug, Deserialize)]
struct ConditionsResponse {
    current_observation: Option<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    temp_c: Option<f64>,
}

/// Temperature provider for Weather Underground.
pub struct WundergroundProvider {
    client: Client,
    base_url: String,
    api_key: String,
    id: ProviderId,
}

impl WundergroundProvider {
    /// Create a provider against the public API.
    #[must_use]
    pub fn new<K: Into<String>>(client: Client, api_key: K) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, api_key)
    }

    /// Create a provider against a custom host, e.g. a proxy or mock server.
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
            id: ProviderId::new(PROVIDER_TAG),
        }
    }
}

#[async_trait]
impl TemperaturePort for WundergroundProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, PortError> {
        // Encoded so `?`, `#` or `/` in a city cannot reshape the request.
        let req = self.client.get(format!(
            "{}/api/{}/conditions/q/{}.json",
            self.base_url,
            self.api_key,
            urlencoding::encode(city)
        ));

        let celsius = fetch_json::<ConditionsResponse>(req)
            .await?
            .current_observation
            .and_then(|observation| observation.temp_c)
            .ok_or(PortError::DataMissing("current_observation.temp_c"))?;
        let kelvin = Kelvin::checked(Kelvin::from_celsius(celsius).value())?;

        info!(provider = PROVIDER_TAG, city, %kelvin, "reading resolved");
        Ok(kelvin)
    }
}
