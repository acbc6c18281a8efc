//! Project workspaces
//!
//! A workspace is one project's checkout for one runner slot. Its path is
//! `<workdir>/<runner>/<project>_<version>`, so runners never share a
//! directory and every version gets its own checkout, which later tasks of
//! the same version reuse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use drone_core::{LogLevel, Project, ReleaseRequest, Task, TaskId, TaskResult, TaskTracker};
use git_checkout::{CheckoutError, VersionControl};

use crate::config::DroneConfig;
use crate::error::{DroneError, Result};
use crate::process::{entry_point_path, locate_entry_point, run_entry_point, TaskEnv};
use crate::snapshot::Snapshot;

/// Checkout directory of `project` for `runner`
pub fn checkout_path(workdir: &Path, runner: &str, project: &Project) -> PathBuf {
    workdir
        .join(runner)
        .join(format!("{}_{}", project.name, project.version))
}

/// Collaborators shared by every workspace of a drone
#[derive(Clone)]
pub struct WorkspaceContext {
    pub tracker: Arc<dyn TaskTracker>,
    pub vcs: Arc<dyn VersionControl>,
    pub config: Arc<DroneConfig>,
}

impl WorkspaceContext {
    pub fn new(
        tracker: Arc<dyn TaskTracker>,
        vcs: Arc<dyn VersionControl>,
        config: Arc<DroneConfig>,
    ) -> Self {
        Self {
            tracker,
            vcs,
            config,
        }
    }
}

/// Whether the workspace has a working tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
    Undeployed,
    Deployed,
}

/// A task that went all the way to release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub task_id: TaskId,
    pub result: TaskResult,
    /// `None` for skipped tasks and processes that never exited normally
    pub exit_code: Option<i32>,
}

/// One project's checkout owned by one runner
pub struct Workspace {
    runner: String,
    project: Project,
    snapshot: Arc<Snapshot>,
    ctx: WorkspaceContext,
    path: PathBuf,
    state: DeploymentState,
}

impl Workspace {
    /// Create a workspace for `project`; nothing touches the disk until deploy
    pub fn new(
        runner: impl Into<String>,
        project: Project,
        snapshot: Arc<Snapshot>,
        ctx: WorkspaceContext,
    ) -> Self {
        let runner = runner.into();
        let path = checkout_path(&ctx.config.workdir, &runner, &project);
        Self {
            runner,
            project,
            snapshot,
            ctx,
            path,
            state: DeploymentState::Undeployed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Materialize the project at its target version.
    ///
    /// Reuses a valid checkout already at the path. A failed clone never
    /// leaves a directory behind.
    pub async fn deploy(&mut self) -> Result<()> {
        if self.state == DeploymentState::Deployed {
            return Ok(());
        }

        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.deployment_error(e.into()))?;
        if exists {
            match self.ctx.vcs.is_repository(&self.path).await {
                Ok(true) => {
                    debug!(path = ?self.path, "Reusing existing checkout");
                    self.state = DeploymentState::Deployed;
                    return Ok(());
                }
                Ok(false) => {
                    warn!(path = ?self.path, "Removing invalid checkout");
                }
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Removing unreadable checkout");
                }
            }
            tokio::fs::remove_dir_all(&self.path)
                .await
                .map_err(|e| self.deployment_error(e.into()))?;
        }

        info!(
            project = %self.project.name,
            version = %self.project.version,
            "Deploying project"
        );

        if let Err(source) = self.clone_at_version().await {
            if let Err(e) = remove_if_exists(&self.path).await {
                error!(path = ?self.path, error = %e, "Failed to remove partial checkout");
            }
            return Err(self.deployment_error(source));
        }

        self.state = DeploymentState::Deployed;
        Ok(())
    }

    fn deployment_error(&self, source: CheckoutError) -> DroneError {
        DroneError::Deployment {
            project: self.project.name.clone(),
            source,
        }
    }

    async fn clone_at_version(&self) -> git_checkout::Result<()> {
        let vcs = &self.ctx.vcs;
        vcs.shallow_clone(&self.project.clone_url, &self.path).await?;

        let version = &self.project.version;
        if version.is_empty() {
            return Ok(());
        }
        // A shallow clone only has the branch tip
        if !vcs.has_commit(&self.path, version).await? {
            vcs.fetch(&self.path, version).await?;
        }
        vcs.checkout(&self.path, version).await
    }

    /// Bring the checkout to the project's target version, deploying first if needed
    pub async fn update(&mut self) -> Result<()> {
        if self.state == DeploymentState::Undeployed {
            self.deploy().await?;
        }

        let version = self.project.version.clone();
        if version.is_empty() {
            return Ok(());
        }

        let head = self
            .ctx
            .vcs
            .head(&self.path)
            .await
            .map_err(|source| self.update_error(source))?;
        if same_commit(&head, &version) {
            return Ok(());
        }

        info!(
            project = %self.project.name,
            from = %head,
            to = %version,
            "Updating checkout"
        );
        self.ctx
            .vcs
            .fetch(&self.path, &version)
            .await
            .map_err(|source| self.update_error(source))?;
        self.ctx
            .vcs
            .checkout(&self.path, &version)
            .await
            .map_err(|source| self.update_error(source))?;
        Ok(())
    }

    fn update_error(&self, source: CheckoutError) -> DroneError {
        DroneError::Update {
            project: self.project.name.clone(),
            version: self.project.version.clone(),
            source,
        }
    }

    /// Throw away everything a task changed in the checkout
    pub async fn reset(&self) -> git_checkout::Result<()> {
        debug!(path = ?self.path, "Reset workspace");
        self.ctx.vcs.reset_hard(&self.path).await
    }

    /// Delete the checkout
    pub async fn cleanup(&mut self) -> Result<()> {
        info!(runner = %self.runner, path = ?self.path, "Cleaning up workspace");
        remove_if_exists(&self.path).await?;
        self.state = DeploymentState::Undeployed;
        Ok(())
    }

    /// Run `task` and report its verdict.
    ///
    /// Tasks of non-deployable projects are released as `SKIP` untouched.
    /// Once the checkout is up to date, it is reset before returning no
    /// matter how execution or reporting went.
    pub async fn execute(&mut self, task: &Task) -> Result<Execution> {
        if !task.project.is_deployable() {
            warn!(
                task_id = task.id,
                project = %task.project.name,
                "Project does not have clone URL, skipping task"
            );
            self.release(task.id, TaskResult::Skip).await?;
            return Ok(Execution {
                task_id: task.id,
                result: TaskResult::Skip,
                exit_code: None,
            });
        }

        self.update().await?;

        let outcome = self.execute_deployed(task).await;
        if let Err(e) = self.reset().await {
            error!(path = ?self.path, error = %e, "Error during reset");
        }
        outcome
    }

    async fn execute_deployed(&self, task: &Task) -> Result<Execution> {
        let Some(entry_point) = locate_entry_point(&self.path).await? else {
            warn!(
                project = %self.project.name,
                path = ?self.path,
                "Checkout has no entry point"
            );
            tokio::time::sleep(self.ctx.config.missing_entry_point_backoff).await;
            return Err(DroneError::MissingEntryPoint {
                path: entry_point_path(&self.path),
            });
        };

        let env = TaskEnv {
            project_name: task.project.name.clone(),
            project_secret: self.snapshot.secret(task.project.id).to_string(),
            recipe: task.recipe.clone(),
        };
        let output = run_entry_point(&self.path, &entry_point, &env).await;
        let result = output.result();

        if result == TaskResult::Fail {
            error!(
                task_id = task.id,
                exit_code = ?output.exit_code,
                spawn_error = ?output.spawn_error,
                "Failed to execute task"
            );
        }

        // Output is reported before the verdict; a task whose output could
        // not be forwarded stays unreleased.
        if !output.stderr.is_empty() {
            self.forward(task.id, LogLevel::Error, &output.stderr).await?;
        }
        if !output.stdout.is_empty() {
            self.forward(task.id, LogLevel::Info, &output.stdout).await?;
        }

        self.release(task.id, result).await?;

        info!(task_id = task.id, result = %result, "Task released");
        Ok(Execution {
            task_id: task.id,
            result,
            exit_code: output.exit_code,
        })
    }

    async fn forward(&self, task_id: TaskId, level: LogLevel, text: &str) -> Result<()> {
        self.ctx
            .tracker
            .log(level, text)
            .await
            .and_then(|ack| ack.into_result())
            .map_err(|source| DroneError::Reporting { task_id, source })
    }

    async fn release(&self, task_id: TaskId, result: TaskResult) -> Result<()> {
        self.ctx
            .tracker
            .release_task(ReleaseRequest::new(task_id, result))
            .await
            .and_then(|ack| ack.into_result())
            .map_err(|source| DroneError::Reporting { task_id, source })
    }
}

/// Full and abbreviated commit ids name the same commit
fn same_commit(head: &str, version: &str) -> bool {
    head == version || (version.len() >= 7 && head.starts_with(version))
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
