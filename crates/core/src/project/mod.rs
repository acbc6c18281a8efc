//! Project module
//!
//! A Project is a version-controlled code base registered on the task
//! tracker. Tasks belong to Projects.

mod model;

pub use model::*;
