//! Core library for the task tracker drone
//!
//! This crate contains the shared domain model and the boundary to the
//! central task tracker:
//! - Projects and tasks as served by the tracker
//! - Worker identity and its on-disk record
//! - The `TaskTracker` RPC interface and its HTTP client

pub mod error;
pub mod project;
pub mod task;
pub mod tracker;
pub mod worker;

pub use error::Error;
pub use project::{Project, ProjectId};
pub use task::{Task, TaskId, TaskResult};
pub use tracker::{Ack, AccessRequest, HttpTaskTracker, LogLevel, ReleaseRequest, TaskFetch, TaskTracker};
pub use worker::{obtain_identity, IdentityStore, WorkerIdentity};

pub type Result<T> = std::result::Result<T, Error>;
