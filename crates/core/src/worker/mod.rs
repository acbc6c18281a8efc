//! Worker module
//!
//! The identity this drone uses to authenticate against the tracker, and
//! the small on-disk record that keeps it stable across restarts.

mod identity;
mod store;

pub use identity::WorkerIdentity;
pub use store::{obtain_identity, IdentityStore};
