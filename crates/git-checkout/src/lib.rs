//! Git checkout management library
//!
//! This crate provides the version-control operations a drone performs on
//! a project's working copy: shallow clone, pin to a commit, fetch newer
//! commits and throw away whatever a task left behind.

mod checkout;
mod commands;
mod error;

pub use checkout::{GitCli, VersionControl};
pub use commands::{git_command, git_command_checked, GitOutput};
pub use error::{CheckoutError, Result};
