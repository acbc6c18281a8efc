//! Entry point process management

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use drone_core::TaskResult;

use crate::config::ENTRY_POINT;

/// Environment handed to the entry point of a task
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub project_name: String,
    pub project_secret: String,
    pub recipe: String,
}

impl TaskEnv {
    fn vars(&self) -> [(&'static str, &str); 3] {
        [
            ("PROJECT_NAME", self.project_name.as_str()),
            ("PROJECT_SECRET", self.project_secret.as_str()),
            ("TASK_RECIPE", self.recipe.as_str()),
        ]
    }
}

/// Everything the entry point left behind
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// `None` when the process never started or was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub spawn_error: Option<String>,
}

impl ProcessOutput {
    /// Verdict for the tracker
    pub fn result(&self) -> TaskResult {
        if self.spawn_error.is_some() {
            return TaskResult::Fail;
        }
        TaskResult::from_exit_code(self.exit_code)
    }
}

/// Location of the entry point inside a checkout
pub fn entry_point_path(checkout: &Path) -> PathBuf {
    checkout.join(ENTRY_POINT)
}

/// The entry point of `checkout`, if the project ships one
pub async fn locate_entry_point(checkout: &Path) -> std::io::Result<Option<PathBuf>> {
    let path = entry_point_path(checkout);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(Some(path)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run `entry_point` to completion inside `checkout`, capturing its output.
///
/// The child starts from an empty environment: only `PATH` is inherited,
/// next to the task variables.
pub async fn run_entry_point(checkout: &Path, entry_point: &Path, env: &TaskEnv) -> ProcessOutput {
    info!("Spawning {:?} in {:?}", entry_point, checkout);

    let mut cmd = Command::new(entry_point);
    cmd.current_dir(checkout)
        .env_clear()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(path) = std::env::var_os("PATH") {
        cmd.env("PATH", path);
    }
    for (key, value) in env.vars() {
        cmd.env(key, value);
    }

    match cmd.output().await {
        Ok(output) => {
            let result = ProcessOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                spawn_error: None,
            };
            debug!(
                exit_code = ?result.exit_code,
                stdout_len = result.stdout.len(),
                stderr_len = result.stderr.len(),
                "Entry point exited"
            );
            result
        }
        Err(e) => {
            warn!(error = %e, "Failed to spawn entry point");
            ProcessOutput {
                spawn_error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}
