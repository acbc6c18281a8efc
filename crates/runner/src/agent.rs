//! Agent: composition root owning the snapshot cache and every loop

use std::sync::Arc;

use futures::future::select_all;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use drone_core::TaskTracker;
use git_checkout::VersionControl;

use crate::access::access_loop;
use crate::config::DroneConfig;
use crate::error::{DroneError, Result};
use crate::refresh::{refresh_loop, refresh_once};
use crate::runner::Runner;
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::workspace::WorkspaceContext;

/// A bootstrapped drone, ready to run its loops
pub struct Agent {
    config: Arc<DroneConfig>,
    tracker: Arc<dyn TaskTracker>,
    vcs: Arc<dyn VersionControl>,
    cache: Arc<SnapshotCache>,
}

impl Agent {
    /// Prepare the working directory and load the first snapshot.
    ///
    /// Every failure here is a `Startup` error; nothing runs yet.
    pub async fn bootstrap(
        mut config: DroneConfig,
        tracker: Arc<dyn TaskTracker>,
        vcs: Arc<dyn VersionControl>,
    ) -> Result<Self> {
        if config.concurrency == 0 {
            return Err(DroneError::startup("Concurrency must be at least 1"));
        }

        tokio::fs::create_dir_all(&config.workdir)
            .await
            .map_err(|e| {
                DroneError::startup_with_source(
                    format!("Cannot create workdir {}", config.workdir.display()),
                    e,
                )
            })?;
        config.workdir = tokio::fs::canonicalize(&config.workdir)
            .await
            .map_err(|e| {
                DroneError::startup_with_source(
                    format!("Cannot resolve workdir {}", config.workdir.display()),
                    e,
                )
            })?;

        let cache = Arc::new(SnapshotCache::new(Snapshot::empty()));
        let snapshot = refresh_once(tracker.as_ref(), &cache)
            .await
            .map_err(|e| DroneError::startup_with_source("Initial project refresh failed", e))?;

        info!(
            alias = %config.alias,
            workdir = ?config.workdir,
            projects = snapshot.projects().len(),
            "Agent bootstrapped"
        );

        Ok(Self {
            config: Arc::new(config),
            tracker,
            vcs,
            cache,
        })
    }

    pub fn config(&self) -> &DroneConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// One runner per concurrency slot, named after the alias
    pub fn runners(&self) -> Vec<Runner> {
        let ctx = WorkspaceContext::new(
            Arc::clone(&self.tracker),
            Arc::clone(&self.vcs),
            Arc::clone(&self.config),
        );
        (0..self.config.concurrency)
            .map(|i| Runner::new(self.config.runner_name(i), Arc::clone(&self.cache), ctx.clone()))
            .collect()
    }

    /// Run the refresh, access and runner loops.
    ///
    /// The loops never finish on their own, so this only returns when one of
    /// them panicked; the remaining loops are aborted.
    pub async fn run(self) -> Result<()> {
        let mut names = Vec::with_capacity(self.config.concurrency + 2);
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.config.concurrency + 2);

        names.push("refresh".to_string());
        handles.push(tokio::spawn(
            refresh_loop(
                Arc::clone(&self.tracker),
                Arc::clone(&self.cache),
                self.config.refresh_interval,
            )
            .instrument(info_span!("refresh")),
        ));

        names.push("access".to_string());
        handles.push(tokio::spawn(
            access_loop(
                Arc::clone(&self.tracker),
                self.cache.subscribe(),
                self.config.refresh_interval,
            )
            .instrument(info_span!("access")),
        ));

        for runner in self.runners() {
            let span = info_span!("runner", name = %runner.name());
            names.push(runner.name().to_string());
            handles.push(tokio::spawn(runner.run().instrument(span)));
        }

        info!(runners = self.config.concurrency, "Agent running");

        let (finished, index, remaining) = select_all(handles).await;
        for handle in remaining {
            handle.abort();
        }

        let task = names.swap_remove(index);
        let message = match finished {
            Ok(()) => "exited".to_string(),
            Err(e) => e.to_string(),
        };
        error!(%task, %message, "Loop stopped");
        Err(DroneError::Aborted { task, message })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakeVcs, RecordingTracker};
    use drone_core::{Project, ReleaseRequest, Task, TaskFetch, TaskResult};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn project() -> Project {
        Project::new(1, "P1", "abc123").with_clone_url("https://example/p1.git")
    }

    #[tokio::test]
    async fn test_bootstrap_prepares_workdir_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let workdir = dir.path().join("nested").join("workdir");
        let tracker = Arc::new(RecordingTracker::with_projects(vec![project()]));

        let agent = Agent::bootstrap(test_config(&workdir), tracker, Arc::new(FakeVcs::default()))
            .await
            .unwrap();

        assert!(workdir.is_dir());
        assert!(agent.config().workdir.is_absolute());
        assert_eq!(agent.cache().current().generation, 1);
        assert_eq!(agent.cache().current().secret(1), "secret-1");
    }

    #[tokio::test]
    async fn test_bootstrap_fails_without_projects() {
        let dir = TempDir::new().unwrap();
        let tracker = Arc::new(RecordingTracker::with_projects(vec![project()]));
        tracker.fail_list.store(true, Ordering::SeqCst);

        let result =
            Agent::bootstrap(test_config(dir.path()), tracker, Arc::new(FakeVcs::default())).await;

        match result {
            Err(e @ DroneError::Startup { .. }) => assert!(!e.is_transient()),
            Err(other) => panic!("Expected Startup error, got: {:?}", other),
            Ok(_) => panic!("Expected Startup error"),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.concurrency = 0;

        let result = Agent::bootstrap(
            config,
            Arc::new(RecordingTracker::default()),
            Arc::new(FakeVcs::default()),
        )
        .await;

        assert!(matches!(result, Err(DroneError::Startup { .. })));
    }

    #[tokio::test]
    async fn test_runner_names() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.concurrency = 3;

        let agent = Agent::bootstrap(
            config,
            Arc::new(RecordingTracker::default()),
            Arc::new(FakeVcs::default()),
        )
        .await
        .unwrap();

        let names: Vec<String> = agent.runners().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["test-0", "test-1", "test-2"]);
    }

    #[tokio::test]
    async fn test_run_executes_and_requests_access() {
        let dir = TempDir::new().unwrap();
        let tracker = Arc::new(RecordingTracker::with_projects(vec![project()]));
        tracker.push_fetch(
            1,
            Ok(TaskFetch::Assigned(Task::new(42, project()).with_recipe("noop"))),
        );
        let vcs = Arc::new(FakeVcs::with_entry_point("#!/bin/sh\nexit 0\n"));

        let agent = Agent::bootstrap(
            test_config(dir.path()),
            Arc::clone(&tracker) as Arc<dyn TaskTracker>,
            vcs,
        )
        .await
        .unwrap();
        let handle = tokio::spawn(agent.run());

        tokio::time::timeout(Duration::from_secs(10), async {
            while tracker.releases().is_empty() || tracker.access_requests().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            tracker.releases(),
            vec![ReleaseRequest::new(42, TaskResult::Ok)]
        );
        assert_eq!(tracker.access_requests()[0].project, 1);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
