//! Task tracker module
//!
//! The RPC boundary to the central task tracker. Everything the drone
//! knows about projects, tasks and credentials comes through the
//! `TaskTracker` trait; `HttpTaskTracker` is the production implementation.

mod http;
mod model;

pub use http::HttpTaskTracker;
pub use model::*;

use async_trait::async_trait;

use crate::project::{Project, ProjectId};
use crate::task::Task;
use crate::worker::WorkerIdentity;
use crate::Result;

/// Message the tracker sends with `ok=false` when a project's queue is idle
pub const NO_TASK_AVAILABLE: &str = "No task available";

/// Outcome of asking the tracker for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFetch {
    /// A task was assigned to this worker
    Assigned(Task),
    /// The project has no task right now
    Empty,
    /// The tracker refused for any other reason
    Rejected(String),
}

/// Operations the drone needs from the task tracker
#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Register a new worker under `alias`
    async fn register_worker(&self, alias: &str) -> Result<WorkerIdentity>;

    /// Get all projects visible to this worker
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Get the secret of a project
    async fn project_secret(&self, project: ProjectId) -> Result<String>;

    /// Ask for assignment and/or submit rights on a project
    async fn request_access(&self, request: AccessRequest) -> Result<Ack>;

    /// Ask for one task of a project
    async fn fetch_task(&self, project: ProjectId) -> Result<TaskFetch>;

    /// Report the verdict of a task
    async fn release_task(&self, request: ReleaseRequest) -> Result<Ack>;

    /// Forward a log line to the tracker's log sink
    async fn log(&self, level: LogLevel, message: &str) -> Result<Ack>;
}
