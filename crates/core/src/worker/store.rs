//! Worker identity persistent store
//!
//! One small JSON record per alias, so a restarted drone keeps its
//! identity on the tracker instead of registering a new worker.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::info;

use super::identity::WorkerIdentity;
use crate::error::Error;
use crate::tracker::TaskTracker;
use crate::Result;

/// File-based store of worker identities
#[derive(Debug, Clone)]
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the record for `alias`
    pub fn path_for(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("worker_{}.json", alias))
    }

    /// Load the identity saved for `alias`, if any
    pub async fn load(&self, alias: &str) -> Result<Option<WorkerIdentity>> {
        let path = self.path_for(alias);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read worker file: {}", e)))?;
        let identity = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse worker file: {}", e)))?;
        Ok(Some(identity))
    }

    /// Persist `identity` under its alias
    pub async fn save(&self, identity: &WorkerIdentity) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&identity.alias);
        let content = serde_json::to_string(identity)?;
        let mut file = open_private(&path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Open `path` for writing, readable by the owner only from creation on
#[cfg(unix)]
async fn open_private(path: &Path) -> Result<tokio::fs::File> {
    use std::os::unix::fs::PermissionsExt;

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    // The mode only applies on creation; tighten a record left by older runs
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .await?;
    Ok(file)
}

#[cfg(not(unix))]
async fn open_private(path: &Path) -> Result<tokio::fs::File> {
    Ok(tokio::fs::File::create(path).await?)
}

/// Load the identity for `alias`, registering a new worker when none is saved
pub async fn obtain_identity(
    store: &IdentityStore,
    tracker: &dyn TaskTracker,
    alias: &str,
) -> Result<WorkerIdentity> {
    if let Some(identity) = store.load(alias).await? {
        info!(alias, "Loaded worker from file");
        return Ok(identity);
    }

    let identity = tracker.register_worker(alias).await?;
    info!(alias, worker_id = identity.id, "Registered new worker");
    store.save(&identity).await?;
    Ok(identity)
}
