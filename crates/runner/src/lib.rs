//! Drone runner
//!
//! Polls the task tracker for work, deploys project checkouts under the
//! working directory and runs their entry point for each assigned task.
//! The [`Agent`] ties together the snapshot refresh, access requests and
//! one [`Runner`] loop per concurrency slot.

mod access;
mod agent;
mod config;
mod error;
mod process;
mod refresh;
mod runner;
mod snapshot;
mod workspace;

#[cfg(test)]
mod testing;

pub use access::{access_loop, AccessRequester};
pub use agent::Agent;
pub use config::{DroneConfig, ENTRY_POINT};
pub use error::{DroneError, Result};
pub use process::{run_entry_point, ProcessOutput, TaskEnv};
pub use refresh::{fetch_snapshot, refresh_loop, refresh_once};
pub use runner::{PollOutcome, Runner};
pub use snapshot::{Snapshot, SnapshotCache};
pub use workspace::{checkout_path, DeploymentState, Execution, Workspace, WorkspaceContext};
