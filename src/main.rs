//! # Vehicle Simulator
//!
//! Drives a single simulated vehicle around an ITN route, publishing its
//! lifecycle and telemetry to an MQTT broker until interrupted.

mod config;
mod provider;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use pubsub::{Connection, QoS, Subscriber};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};
use vehicle::route::list_routes;
use vehicle::{Coordinate, SimConfig, VehicleSimulator, last_will, load_route};

use crate::config::Config;
use crate::provider::MqttProvider;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default().with(filter).with(fmt::layer()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "vehicle simulator failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env();
    let sim_config = SimConfig::from_env();

    let route_file = resolve_route(&config.route_file)?;
    let waypoints = load_route(&route_file)?;
    info!(route = %route_file.display(), waypoints = waypoints.len(), "route loaded");

    let will = last_will(&sim_config, &config.vehicle_id)?;
    let status_topic = sim_config.status_topic().to_string();
    let provider = Arc::new(MqttProvider::connect(&config.mqtt, will).await?);

    let result =
        simulate(&config, waypoints, Arc::clone(&provider), sim_config, &status_topic).await;
    if let Err(e) = provider.disconnect().await {
        error!(error = %e, "failed to disconnect cleanly");
    }
    result
}

async fn simulate(
    config: &Config, waypoints: Vec<Coordinate>, provider: Arc<MqttProvider>,
    sim_config: SimConfig, status_topic: &str,
) -> Result<()> {
    // lifecycle messages of every vehicle on the broker, ours included
    provider.subscribe(status_topic, QoS::AtLeastOnce).await?;

    let simulator = VehicleSimulator::new(&config.vehicle_id, waypoints, provider, sim_config)?;
    simulator.run_until(shutdown_signal()).await?;

    let stats = simulator.stats();
    info!(ticks = stats.ticks, publish_errors = stats.publish_errors, "simulation finished");
    Ok(())
}

/// A route file, or the first ITN file of a route directory.
fn resolve_route(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }
    let routes = list_routes(path)?;
    routes
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no .itn files"))
        .with_context(|| format!("choosing a route from {}", path.display()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
