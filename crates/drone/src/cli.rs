//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use drone_runner::DroneConfig;

/// Worker executing task tracker tasks from project checkouts
#[derive(Parser, Debug)]
#[command(name = "drone", version, about)]
pub struct Cli {
    /// Base URL of the task tracker API
    #[arg(long, env = "TT_API_URL")]
    pub api_url: String,

    /// Worker alias, used to register and to name the runners
    #[arg(long, env = "TT_ALIAS")]
    pub alias: String,

    /// Root directory of the project checkouts
    #[arg(long, env = "TT_WORKDIR", default_value = "workdir")]
    pub workdir: PathBuf,

    /// Directory holding the saved worker identity
    #[arg(long, env = "TT_IDENTITY_DIR", default_value = ".")]
    pub identity_dir: PathBuf,

    /// Number of concurrent runners
    #[arg(long, env = "TT_CONCURRENCY", default_value_t = 20)]
    pub concurrency: usize,

    /// Seconds between project list refreshes
    #[arg(long, env = "TT_REFRESH_INTERVAL", default_value_t = 60)]
    pub refresh_interval: u64,

    /// Milliseconds to wait after a project had no task
    #[arg(long, env = "TT_IDLE_BACKOFF_MS", default_value_t = 1000)]
    pub idle_backoff_ms: u64,

    /// Milliseconds to wait when a checkout has no entry point
    #[arg(long, env = "TT_MISSING_ENTRY_POINT_BACKOFF_MS", default_value_t = 5000)]
    pub missing_entry_point_backoff_ms: u64,

    /// Log as JSON lines
    #[arg(long, env = "TT_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn drone_config(&self) -> DroneConfig {
        DroneConfig {
            alias: self.alias.clone(),
            workdir: self.workdir.clone(),
            concurrency: self.concurrency,
            refresh_interval: Duration::from_secs(self.refresh_interval),
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
            missing_entry_point_backoff: Duration::from_millis(self.missing_entry_point_backoff_ms),
        }
    }
}
