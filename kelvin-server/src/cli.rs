//! Command-line arguments.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Serve the mean temperature of a city across several weather providers.
///
/// Examples:
///   kelvin-server --openweathermap-key KEY
///   kelvin-server --config kelvin.toml --bind 127.0.0.1:9000 --provider-timeout 5
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for kelvin.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server listens on
    #[arg(short, long, value_name = "ADDR", env = "KELVIN_BIND")]
    pub bind: Option<SocketAddr>,

    /// Deadline for every individual provider call
    #[arg(long, value_name = "SECS")]
    pub provider_timeout: Option<u64>,

    /// Abort the remaining provider calls as soon as one fails
    #[arg(long)]
    pub abort_on_failure: bool,

    /// `OpenWeatherMap` API key; also enables coordinate lookup for Dark Sky
    #[arg(long, value_name = "KEY", env = "OPENWEATHERMAP_API_KEY", hide_env_values = true)]
    pub openweathermap_key: Option<String>,

    /// Dark Sky API key
    #[arg(long, value_name = "KEY", env = "DARKSKY_API_KEY", hide_env_values = true)]
    pub darksky_key: Option<String>,

    /// Weather Underground API key
    #[arg(long, value_name = "KEY", env = "WUNDERGROUND_API_KEY", hide_env_values = true)]
    pub wunderground_key: Option<String>,

    /// Enable debug logging (ignored when `RUST_LOG` is set)
    #[arg(short, long)]
    pub verbose: bool,
}
