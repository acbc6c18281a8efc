//! Request and response types of the task tracker API

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::project::{Project, ProjectId};
use crate::task::{Task, TaskId, TaskResult};
use crate::worker::WorkerIdentity;
use crate::Result;

/// Response envelope shared by every tracker endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    pub content: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ack(&self) -> Ack {
        Ack {
            ok: self.ok,
            message: self.message.clone(),
        }
    }

    /// Payload of a successful response
    pub fn into_content(self, what: &'static str) -> Result<T> {
        if !self.ok {
            return Err(Error::Rejected(self.message));
        }
        self.content.ok_or(Error::MissingContent(what))
    }
}

/// Acknowledgement of a request that carries no payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Ack {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    /// Turn a rejection into an error
    pub fn into_result(self) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(Error::Rejected(self.message))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateWorkerRequest<'a> {
    pub alias: &'a str,
}

/// Request for rights on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessRequest {
    pub project: ProjectId,
    /// Right to be assigned tasks
    pub assign: bool,
    /// Right to submit tasks
    pub submit: bool,
}

impl AccessRequest {
    /// Assignment rights only, which is all a drone needs
    pub fn assign_only(project: ProjectId) -> Self {
        Self {
            project,
            assign: true,
            submit: false,
        }
    }
}

/// Verdict of a task sent back to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    pub task_id: TaskId,
    pub result: TaskResult,
    pub verification: i64,
}

impl ReleaseRequest {
    pub fn new(task_id: TaskId, result: TaskResult) -> Self {
        Self {
            task_id,
            result,
            verification: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LogRequest<'a> {
    pub message: &'a str,
    pub timestamp: i64,
}

/// Severity of a line forwarded to the tracker's log sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Standard output of a task
    Info,
    /// Error output of a task
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkerContent {
    pub worker: WorkerIdentity,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectsContent {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretContent {
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskContent {
    pub task: Task,
}
