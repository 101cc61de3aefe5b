//! Builds the provider set from configuration.

use std::sync::Arc;

use anyhow::{Result, bail};
use reqwest::Client;
use tracing::info;

use kelvin_core::{ProviderSet, TemperaturePort};
use kelvin_provider_darksky::{self as darksky, DarkSkyProvider};
use kelvin_provider_openweathermap::{self as openweathermap, OpenWeatherMapApi};
use kelvin_provider_wunderground::{self as wunderground, WundergroundProvider};

use crate::config::ProvidersConfig;

/// Instantiate every provider that has credentials, in a fixed order.
pub(crate) fn build(config: &ProvidersConfig, client: &Client) -> Result<ProviderSet> {
    let mut providers: Vec<Arc<dyn TemperaturePort>> = Vec::new();

    let owm = config.openweathermap.api_key.as_ref().map(|key| {
        let base_url = config
            .openweathermap
            .base_url
            .as_deref()
            .unwrap_or(openweathermap::DEFAULT_BASE_URL);
        OpenWeatherMapApi::with_base_url(client.clone(), base_url, key.as_str())
    });

    if let Some(api) = &owm {
        providers.push(openweathermap::provider(api.clone()));
    }

    if let Some(key) = &config.darksky.api_key {
        let Some(api) = &owm else {
            bail!("Dark Sky needs an OpenWeatherMap API key for coordinate lookup");
        };
        let base_url = config
            .darksky
            .base_url
            .as_deref()
            .unwrap_or(darksky::DEFAULT_BASE_URL);
        providers.push(Arc::new(DarkSkyProvider::with_base_url(
            client.clone(),
            base_url,
            key.as_str(),
            openweathermap::geocoder(api.clone()),
        )));
    }

    if let Some(key) = &config.wunderground.api_key {
        let base_url = config
            .wunderground
            .base_url
            .as_deref()
            .unwrap_or(wunderground::DEFAULT_BASE_URL);
        providers.push(Arc::new(WundergroundProvider::with_base_url(
            client.clone(),
            base_url,
            key.as_str(),
        )));
    }

    if providers.is_empty() {
        bail!("No provider configured; supply at least one API key");
    }

    let set = ProviderSet::new(providers);
    info!(providers = ?set.ids(), "providers registered");
    Ok(set)
}
