//! Task model definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::project::Project;

/// Tracker-assigned task identifier
pub type TaskId = i64;

/// A unit of work assigned to this worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// The project the task belongs to, as embedded by the tracker
    pub project: Project,
    /// Opaque instruction payload handed to the entry point
    #[serde(default)]
    pub recipe: String,
}

impl Task {
    /// Create a new task for the given project
    pub fn new(id: TaskId, project: Project) -> Self {
        Self {
            id,
            project,
            recipe: String::new(),
        }
    }

    /// Set the recipe
    pub fn with_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.recipe = recipe.into();
        self
    }
}

/// Verdict reported to the tracker when a task is released.
///
/// Encoded on the wire as the tracker's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TaskResult {
    Ok,
    Fail,
    Skip,
}

impl TaskResult {
    /// Classify a finished entry point run.
    ///
    /// `None` stands for a process that could not be spawned or was
    /// terminated without an exit code.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Ok,
            _ => Self::Fail,
        }
    }
}

impl From<TaskResult> for i32 {
    fn from(result: TaskResult) -> Self {
        match result {
            TaskResult::Ok => 0,
            TaskResult::Fail => 1,
            TaskResult::Skip => 2,
        }
    }
}

impl TryFrom<i32> for TaskResult {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Fail),
            2 => Ok(Self::Skip),
            other => Err(format!("unknown task result code {}", other)),
        }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        };
        f.write_str(s)
    }
}
