//! Shared project/secret snapshot

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use drone_core::{Project, ProjectId};

/// Project list and project secrets from one refresh cycle.
///
/// Never mutated after construction; a refresh publishes a new value.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Position in the sequence of published snapshots, 0 before publication
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    projects: Vec<Project>,
    secrets: HashMap<ProjectId, String>,
}

impl Snapshot {
    pub fn new(projects: Vec<Project>, secrets: HashMap<ProjectId, String>) -> Self {
        Self {
            generation: 0,
            fetched_at: Utc::now(),
            projects,
            secrets,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), HashMap::new())
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Secret of a project, empty when the tracker returned none
    pub fn secret(&self, id: ProjectId) -> &str {
        self.secrets.get(&id).map(String::as_str).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Process-wide holder of the latest snapshot.
///
/// Readers get an `Arc` of a complete snapshot and never hold the lock
/// across I/O; publishing swaps the whole value at once.
#[derive(Debug)]
pub struct SnapshotCache {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new(initial: Snapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// The latest published snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Replace the snapshot, returning it with its assigned generation
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut published = None;
        self.tx.send_modify(|current| {
            snapshot.generation = current.generation + 1;
            let next = Arc::new(snapshot);
            published = Some(Arc::clone(&next));
            *current = next;
        });
        published.unwrap_or_else(|| self.current())
    }

    /// Receiver notified on every publication
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}
