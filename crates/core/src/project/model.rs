//! Project model definitions

use serde::{Deserialize, Serialize};

/// Tracker-assigned project identifier
pub type ProjectId = i64;

/// A Project as served by the task tracker.
///
/// Projects are immutable snapshots: the drone never edits one, it only
/// replaces the whole list on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    pub id: ProjectId,

    /// Human-readable project name, used in checkout paths
    pub name: String,

    /// Target version: the commit hash the project must be checked out at
    #[serde(default)]
    pub version: String,

    /// Git clone URL. Empty for projects that cannot be deployed.
    #[serde(default)]
    pub clone_url: String,
}

impl Project {
    /// Create a new project with required fields
    pub fn new(id: ProjectId, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            clone_url: String::new(),
        }
    }

    /// Set the clone URL
    pub fn with_clone_url(mut self, url: impl Into<String>) -> Self {
        self.clone_url = url.into();
        self
    }

    /// Whether tasks of this project can be deployed and executed at all
    pub fn is_deployable(&self) -> bool {
        !self.clone_url.trim().is_empty()
    }
}
