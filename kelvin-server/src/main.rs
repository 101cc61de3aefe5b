//! HTTP front end for kelvin that serves the mean temperature of a city.

mod cli;
mod config;
mod providers;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kelvin_core::Aggregator;
use reqwest::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = Config::resolve(&args)?;
    config.merge_with_args(&args);

    // HTTP + service setup
    let client = Client::builder()
        .user_agent(config.server.user_agent.as_str())
        .timeout(Duration::from_secs(config.server.request_timeout_secs))
        .build()?;

    let providers = Arc::new(providers::build(&config.providers, &client)?);
    let settings = config.aggregator.settings();
    let aggregator = Arc::new(Aggregator::with_settings(providers, settings));
    info!(
        timeout = ?settings.provider_timeout,
        on_failure = ?settings.on_failure,
        "aggregator ready"
    );

    let (addr, server) = warp::serve(routes::routes(aggregator))
        .try_bind_with_graceful_shutdown(config.server.bind, shutdown_signal())
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    info!(%addr, "listening");
    server.await;
    info!("shut down");

    Ok(())
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
