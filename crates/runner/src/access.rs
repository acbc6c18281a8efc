//! Access requests for every project the worker has seen

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use drone_core::{AccessRequest, ProjectId, TaskTracker};

use crate::snapshot::Snapshot;

/// Tracks the projects whose assignment rights have been granted
pub struct AccessRequester {
    tracker: Arc<dyn TaskTracker>,
    granted: HashSet<ProjectId>,
}

impl AccessRequester {
    pub fn new(tracker: Arc<dyn TaskTracker>) -> Self {
        Self {
            tracker,
            granted: HashSet::new(),
        }
    }

    pub fn has_access(&self, project: ProjectId) -> bool {
        self.granted.contains(&project)
    }

    /// Request assignment rights on every project of `snapshot` not granted yet.
    ///
    /// Failed or rejected requests are retried on the next call. Returns the
    /// number of newly granted projects.
    pub async fn request_missing(&mut self, snapshot: &Snapshot) -> usize {
        let mut newly_granted = 0;
        for project in snapshot.projects() {
            if self.granted.contains(&project.id) {
                continue;
            }

            let outcome = self
                .tracker
                .request_access(AccessRequest::assign_only(project.id))
                .await
                .and_then(|ack| ack.into_result());
            match outcome {
                Ok(()) => {
                    info!(project = %project.name, "Access granted");
                    self.granted.insert(project.id);
                    newly_granted += 1;
                }
                Err(e) => {
                    warn!(project = %project.name, error = %e, "Access request failed");
                }
            }
        }
        newly_granted
    }
}

/// Request access for the latest snapshot every `period` and after every refresh.
///
/// The timer keeps failed requests retried while refreshes fail and publish
/// nothing. Returns once the snapshot cache is gone.
pub async fn access_loop(
    tracker: Arc<dyn TaskTracker>,
    mut snapshots: watch::Receiver<Arc<Snapshot>>,
    period: Duration,
) {
    let mut requester = AccessRequester::new(tracker);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = snapshots.changed() => {
                if changed.is_err() {
                    debug!("Snapshot cache closed, stopping access requests");
                    return;
                }
            }
        }

        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        let granted = requester.request_missing(&snapshot).await;
        debug!(generation = snapshot.generation, granted, "Access requests done");
    }
}
