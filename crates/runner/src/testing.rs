//! Test doubles for the tracker and version control

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use drone_core::{
    AccessRequest, Ack, LogLevel, Project, ProjectId, ReleaseRequest, TaskFetch, TaskTracker,
    WorkerIdentity,
};
use git_checkout::{CheckoutError, VersionControl};

use crate::config::DroneConfig;
use crate::workspace::WorkspaceContext;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCall {
    ListProjects,
    Secret(ProjectId),
    Access(AccessRequest),
    Fetch(ProjectId),
    Release(ReleaseRequest),
    Log(LogLevel, String),
}

/// Scriptable tracker recording every call
#[derive(Default)]
pub struct RecordingTracker {
    pub projects: Mutex<Vec<Project>>,
    pub secrets: Mutex<HashMap<ProjectId, String>>,
    fetches: Mutex<HashMap<ProjectId, VecDeque<drone_core::Result<TaskFetch>>>>,
    access_acks: Mutex<VecDeque<drone_core::Result<Ack>>>,
    pub release_ack: Mutex<Option<Ack>>,
    pub fail_list: AtomicBool,
    pub fail_secret: AtomicBool,
    pub fail_log: AtomicBool,
    calls: Mutex<Vec<TrackerCall>>,
    fetch_times: Mutex<Vec<(ProjectId, Instant)>>,
}

impl RecordingTracker {
    pub fn with_projects(projects: Vec<Project>) -> Self {
        let secrets = projects
            .iter()
            .map(|p| (p.id, format!("secret-{}", p.id)))
            .collect();
        Self {
            projects: Mutex::new(projects),
            secrets: Mutex::new(secrets),
            ..Default::default()
        }
    }

    /// Queue the next answer of `fetch_task` for `project`; afterwards it is `Empty`
    pub fn push_fetch(&self, project: ProjectId, response: drone_core::Result<TaskFetch>) {
        self.fetches
            .lock()
            .unwrap()
            .entry(project)
            .or_default()
            .push_back(response);
    }

    /// Queue the next answer of `request_access`; afterwards it is accepted
    pub fn push_access(&self, response: drone_core::Result<Ack>) {
        self.access_acks.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn releases(&self) -> Vec<ReleaseRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TrackerCall::Release(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TrackerCall::Log(level, text) => Some((level, text)),
                _ => None,
            })
            .collect()
    }

    /// When `project` was asked for a task, in call order
    pub fn fetch_times(&self, project: ProjectId) -> Vec<Instant> {
        self.fetch_times
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == project)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn access_requests(&self) -> Vec<AccessRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TrackerCall::Access(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TrackerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn unavailable() -> drone_core::Error {
    drone_core::Error::Http {
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

#[async_trait]
impl TaskTracker for RecordingTracker {
    async fn register_worker(&self, alias: &str) -> drone_core::Result<WorkerIdentity> {
        Ok(WorkerIdentity::new(1, alias, b"secret".to_vec()))
    }

    async fn list_projects(&self) -> drone_core::Result<Vec<Project>> {
        self.record(TrackerCall::ListProjects);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn project_secret(&self, project: ProjectId) -> drone_core::Result<String> {
        self.record(TrackerCall::Secret(project));
        if self.fail_secret.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&project)
            .cloned()
            .unwrap_or_default())
    }

    async fn request_access(&self, request: AccessRequest) -> drone_core::Result<Ack> {
        self.record(TrackerCall::Access(request));
        self.access_acks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Ack::accepted()))
    }

    async fn fetch_task(&self, project: ProjectId) -> drone_core::Result<TaskFetch> {
        self.record(TrackerCall::Fetch(project));
        self.fetch_times.lock().unwrap().push((project, Instant::now()));
        self.fetches
            .lock()
            .unwrap()
            .get_mut(&project)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(TaskFetch::Empty))
    }

    async fn release_task(&self, request: ReleaseRequest) -> drone_core::Result<Ack> {
        self.record(TrackerCall::Release(request));
        Ok(self
            .release_ack
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(Ack::accepted))
    }

    async fn log(&self, level: LogLevel, message: &str) -> drone_core::Result<Ack> {
        self.record(TrackerCall::Log(level, message.to_string()));
        if self.fail_log.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(Ack::accepted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    IsRepository(PathBuf),
    Clone(String, PathBuf),
    Head(PathBuf),
    HasCommit(PathBuf, String),
    Fetch(PathBuf, String),
    Checkout(PathBuf, String),
    Reset(PathBuf),
}

impl VcsCall {
    /// Whether the call goes over the network
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Clone(..) | Self::Fetch(..))
    }
}

/// Version control on plain directories.
///
/// A clone creates the directory with a `.git` marker and, when configured,
/// an entry point script. The remote is considered to have every commit.
#[derive(Default)]
pub struct FakeVcs {
    /// Contents of the `run` script written on clone
    pub entry_point: Mutex<Option<String>>,
    pub fail_clone: AtomicBool,
    pub fail_fetch: AtomicBool,
    heads: Mutex<HashMap<PathBuf, String>>,
    local_commits: Mutex<HashMap<PathBuf, HashSet<String>>>,
    calls: Mutex<Vec<VcsCall>>,
}

pub const CLONED_TIP: &str = "tip0000";

impl FakeVcs {
    pub fn with_entry_point(script: &str) -> Self {
        Self {
            entry_point: Mutex::new(Some(script.to_string())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn resets(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, VcsCall::Reset(_)))
            .count()
    }

    /// Pretend the checkout at `path` was moved to `rev` behind our back
    pub fn set_head(&self, path: &Path, rev: &str) {
        self.heads
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), rev.to_string());
    }

    fn record(&self, call: VcsCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn is_repository(&self, path: &Path) -> git_checkout::Result<bool> {
        self.record(VcsCall::IsRepository(path.to_path_buf()));
        Ok(path.join(".git").is_dir())
    }

    async fn shallow_clone(&self, url: &str, path: &Path) -> git_checkout::Result<()> {
        self.record(VcsCall::Clone(url.to_string(), path.to_path_buf()));
        tokio::fs::create_dir_all(path).await?;
        if self.fail_clone.load(Ordering::SeqCst) {
            tokio::fs::write(path.join("partial"), "half").await?;
            return Err(CheckoutError::git_failed("connection reset by peer"));
        }

        tokio::fs::create_dir_all(path.join(".git")).await?;
        let script = self.entry_point.lock().unwrap().clone();
        if let Some(script) = script {
            write_executable(&path.join("run"), &script).await?;
        }
        self.set_head(path, CLONED_TIP);
        self.local_commits
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .insert(CLONED_TIP.to_string());
        Ok(())
    }

    async fn head(&self, path: &Path) -> git_checkout::Result<String> {
        self.record(VcsCall::Head(path.to_path_buf()));
        self.heads
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| CheckoutError::NotARepository {
                path: path.to_path_buf(),
            })
    }

    async fn has_commit(&self, path: &Path, rev: &str) -> git_checkout::Result<bool> {
        self.record(VcsCall::HasCommit(path.to_path_buf(), rev.to_string()));
        Ok(self
            .local_commits
            .lock()
            .unwrap()
            .get(path)
            .is_some_and(|commits| commits.contains(rev)))
    }

    async fn fetch(&self, path: &Path, rev: &str) -> git_checkout::Result<()> {
        self.record(VcsCall::Fetch(path.to_path_buf(), rev.to_string()));
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CheckoutError::git_failed("could not resolve host"));
        }
        self.local_commits
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .insert(rev.to_string());
        Ok(())
    }

    async fn checkout(&self, path: &Path, rev: &str) -> git_checkout::Result<()> {
        self.record(VcsCall::Checkout(path.to_path_buf(), rev.to_string()));
        let known = self
            .local_commits
            .lock()
            .unwrap()
            .get(path)
            .is_some_and(|commits| commits.contains(rev));
        if !known {
            return Err(CheckoutError::git_failed(format!("reference is not a tree: {}", rev)));
        }
        self.set_head(path, rev);
        Ok(())
    }

    async fn reset_hard(&self, path: &Path) -> git_checkout::Result<()> {
        self.record(VcsCall::Reset(path.to_path_buf()));
        Ok(())
    }
}

#[cfg(unix)]
pub async fn write_executable(path: &Path, script: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::write(path, script).await?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
pub async fn write_executable(path: &Path, script: &str) -> std::io::Result<()> {
    tokio::fs::write(path, script).await
}

/// Config with backoffs short enough for tests
pub fn test_config(workdir: &Path) -> DroneConfig {
    DroneConfig {
        alias: "test".to_string(),
        workdir: workdir.to_path_buf(),
        concurrency: 2,
        refresh_interval: Duration::from_millis(50),
        idle_backoff: Duration::from_millis(20),
        missing_entry_point_backoff: Duration::from_millis(10),
    }
}

pub fn context(
    tracker: &Arc<RecordingTracker>,
    vcs: &Arc<FakeVcs>,
    workdir: &Path,
) -> WorkspaceContext {
    WorkspaceContext::new(
        Arc::clone(tracker) as Arc<dyn TaskTracker>,
        Arc::clone(vcs) as Arc<dyn VersionControl>,
        Arc::new(test_config(workdir)),
    )
}
