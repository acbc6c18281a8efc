//! Task module
//!
//! This module contains task-related types. Tasks only exist in the drone
//! between being fetched and being released; nothing is persisted.

mod model;

pub use model::*;
