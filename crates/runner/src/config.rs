//! Runtime configuration of the drone

use std::path::PathBuf;
use std::time::Duration;

/// Name of the executable every deployable project must ship at its root
pub const ENTRY_POINT: &str = "run";

/// Configuration for the agent and its loops
#[derive(Debug, Clone)]
pub struct DroneConfig {
    /// Worker alias; runner names are derived from it
    pub alias: String,
    /// Root of all checkouts
    pub workdir: PathBuf,
    /// Number of runner loops
    pub concurrency: usize,
    /// Period of the project/secret refresh and access requests
    pub refresh_interval: Duration,
    /// Sleep after a project reported an empty queue
    pub idle_backoff: Duration,
    /// Sleep before giving up on a checkout without entry point
    pub missing_entry_point_backoff: Duration,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            alias: "drone".to_string(),
            workdir: PathBuf::from("workdir"),
            concurrency: 20,
            refresh_interval: Duration::from_secs(60),
            idle_backoff: Duration::from_secs(1),
            missing_entry_point_backoff: Duration::from_secs(5),
        }
    }
}

impl DroneConfig {
    /// Name of runner slot `index`
    pub fn runner_name(&self, index: usize) -> String {
        format!("{}-{}", self.alias, index)
    }
}
