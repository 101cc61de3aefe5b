//! Configuration file handling.
//!
//! Settings come from `kelvin.toml` (or the file given with `--config`) and are then
//! overridden by whatever the command line or environment provides.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kelvin_core::{AggregatorSettings, FailurePolicy};
use serde::{Deserialize, Serialize};

use crate::cli::Args;

const DEFAULT_CONFIG_FILE: &str = "kelvin.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    /// HTTP listener and outbound client settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Aggregation hardening.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Upstream credentials and hosts.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// User agent sent to every upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout of the shared HTTP client.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_user_agent() -> String {
    format!("kelvin/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AggregatorConfig {
    /// Deadline for each provider call; unset means wait indefinitely.
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,

    /// `detach` or `abort`.
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

impl AggregatorConfig {
    pub(crate) fn settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            provider_timeout: self.provider_timeout_secs.map(Duration::from_secs),
            on_failure: self.on_failure,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ProvidersConfig {
    #[serde(default)]
    pub openweathermap: ProviderConfig,
    #[serde(default)]
    pub darksky: ProviderConfig,
    #[serde(default)]
    pub wunderground: ProviderConfig,
}

/// A provider is enabled when it has an API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the public API host.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the file named on the command line, else `kelvin.toml` if present, else defaults.
    pub(crate) fn resolve(args: &Args) -> Result<Self> {
        if let Some(path) = args.config.as_deref() {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line and environment overrides.
    pub(crate) fn merge_with_args(&mut self, args: &Args) {
        if let Some(bind) = args.bind {
            self.server.bind = bind;
        }
        if let Some(secs) = args.provider_timeout {
            self.aggregator.provider_timeout_secs = Some(secs);
        }
        if args.abort_on_failure {
            self.aggregator.on_failure = FailurePolicy::Abort;
        }

        let keys = [
            (&mut self.providers.openweathermap, &args.openweathermap_key),
            (&mut self.providers.darksky, &args.darksky_key),
            (&mut self.providers.wunderground, &args.wunderground_key),
        ];
        for (provider, key) in keys {
            if let Some(key) = key {
                provider.api_key = Some(key.clone());
            }
        }
    }
}
