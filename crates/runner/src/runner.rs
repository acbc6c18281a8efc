//! Runner loop: one concurrency slot polling every project for tasks

use std::sync::Arc;

use tracing::{debug, error, warn};

use drone_core::{Project, TaskFetch};

use crate::error::DroneError;
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::workspace::{Execution, Workspace, WorkspaceContext};

/// What came of asking one project for a task
#[derive(Debug)]
pub enum PollOutcome {
    /// The fetch itself failed
    FetchFailed(DroneError),
    /// The project had no task
    Idle,
    /// The tracker refused to hand out a task
    Rejected(String),
    /// A task ran and was released
    Executed(Execution),
    /// A task was assigned but could not be run or reported
    Failed(DroneError),
}

/// One runner slot; owns the workspaces it creates and their processes
pub struct Runner {
    name: String,
    cache: Arc<SnapshotCache>,
    ctx: WorkspaceContext,
}

impl Runner {
    pub fn new(name: impl Into<String>, cache: Arc<SnapshotCache>, ctx: WorkspaceContext) -> Self {
        Self {
            name: name.into(),
            cache,
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll forever
    pub async fn run(self) {
        debug!(runner = %self.name, "Runner started");
        loop {
            self.poll_round().await;
        }
    }

    /// Ask every project of the current snapshot for one task.
    ///
    /// The snapshot is taken once per round, so a refresh in between only
    /// shows up in the next round.
    pub async fn poll_round(&self) -> Vec<PollOutcome> {
        let snapshot = self.cache.current();
        if snapshot.is_empty() {
            tokio::time::sleep(self.ctx.config.idle_backoff).await;
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(snapshot.projects().len());
        for project in snapshot.projects() {
            outcomes.push(self.poll_project(&snapshot, project).await);
        }
        outcomes
    }

    async fn poll_project(&self, snapshot: &Arc<Snapshot>, project: &Project) -> PollOutcome {
        let fetch = match self.ctx.tracker.fetch_task(project.id).await {
            Ok(fetch) => fetch,
            Err(e) => {
                error!(runner = %self.name, project = %project.name, error = %e, "Failed to fetch task");
                return PollOutcome::FetchFailed(DroneError::Transport(e));
            }
        };

        let task = match fetch {
            TaskFetch::Assigned(task) => task,
            TaskFetch::Empty => {
                tokio::time::sleep(self.ctx.config.idle_backoff).await;
                return PollOutcome::Idle;
            }
            TaskFetch::Rejected(message) => {
                error!(runner = %self.name, project = %project.name, %message, "Task request rejected");
                return PollOutcome::Rejected(message);
            }
        };

        debug!(runner = %self.name, task_id = task.id, project = %project.name, "Got task");
        let mut workspace = Workspace::new(
            self.name.clone(),
            project.clone(),
            Arc::clone(snapshot),
            self.ctx.clone(),
        );
        match workspace.execute(&task).await {
            Ok(execution) => PollOutcome::Executed(execution),
            Err(e) => {
                warn!(runner = %self.name, task_id = task.id, error = %e, "Task execution failed");
                PollOutcome::Failed(e)
            }
        }
    }
}
