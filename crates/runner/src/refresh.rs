//! Periodic refresh of the project/secret snapshot

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use drone_core::TaskTracker;

use crate::error::{DroneError, Result};
use crate::snapshot::{Snapshot, SnapshotCache};

/// Fetch the project list and the secret of every listed project
pub async fn fetch_snapshot(tracker: &dyn TaskTracker) -> drone_core::Result<Snapshot> {
    let projects = tracker.list_projects().await?;

    let mut secrets = HashMap::with_capacity(projects.len());
    for project in &projects {
        let secret = tracker.project_secret(project.id).await?;
        secrets.insert(project.id, secret);
    }

    Ok(Snapshot::new(projects, secrets))
}

/// Fetch and publish one snapshot.
///
/// On failure nothing is published and readers keep the previous snapshot.
pub async fn refresh_once(
    tracker: &dyn TaskTracker,
    cache: &SnapshotCache,
) -> Result<Arc<Snapshot>> {
    let snapshot = fetch_snapshot(tracker).await.map_err(DroneError::Transport)?;
    let published = cache.publish(snapshot);
    debug!(
        generation = published.generation,
        projects = published.projects().len(),
        "Published project snapshot"
    );
    Ok(published)
}

/// Refresh the cache every `period`, forever.
///
/// The first refresh happens one period after start; the agent publishes the
/// initial snapshot itself before the loops run.
pub async fn refresh_loop(
    tracker: Arc<dyn TaskTracker>,
    cache: Arc<SnapshotCache>,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period_secs = period.as_secs_f64(), "Snapshot refresh started");
    loop {
        ticker.tick().await;
        if let Err(e) = refresh_once(tracker.as_ref(), &cache).await {
            warn!(error = %e, "Failed to refresh projects, keeping previous snapshot");
        }
    }
}
