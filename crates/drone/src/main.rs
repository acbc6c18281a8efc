//! Drone
//!
//! Registers with the task tracker (or reuses the saved identity), then runs
//! the agent until it fails or the process is interrupted.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use drone_core::{obtain_identity, HttpTaskTracker, IdentityStore};
use drone_runner::Agent;
use git_checkout::GitCli;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "drone=info,drone_runner=info,drone_core=info,git_checkout=info";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    tracing::info!(api_url = %cli.api_url, alias = %cli.alias, "Starting drone");

    let tracker = HttpTaskTracker::new(cli.api_url.as_str());
    let store = IdentityStore::new(cli.identity_dir.clone());
    let identity = obtain_identity(&store, &tracker, &cli.alias)
        .await
        .with_context(|| format!("Failed to obtain worker identity for {}", cli.alias))?;
    tracing::info!(worker_id = identity.id, "Worker identity ready");
    let tracker = Arc::new(tracker.with_worker(identity));

    let agent = Agent::bootstrap(cli.drone_config(), tracker, Arc::new(GitCli::new()))
        .await
        .context("Failed to start agent")?;

    tokio::select! {
        result = agent.run() => {
            result.context("Agent stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
