//! Version-control operations on a single checkout

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::commands::{
    clone_location, commit_exists, git_command, git_command_checked, is_checkout_root, rev_parse,
};
use crate::error::{CheckoutError, Result};

/// Operations a workspace needs from its version-control system.
///
/// Every method works on the checkout rooted at `path`. Only
/// `shallow_clone` and `fetch` touch the network.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether `path` holds a usable checkout
    async fn is_repository(&self, path: &Path) -> Result<bool>;

    /// Clone the most recent history of the default branch into `path`
    async fn shallow_clone(&self, url: &str, path: &Path) -> Result<()>;

    /// Commit currently checked out
    async fn head(&self, path: &Path) -> Result<String>;

    /// Whether `rev` is available without fetching
    async fn has_commit(&self, path: &Path, rev: &str) -> Result<bool>;

    /// Bring `rev` and the remote refs into the local object store
    async fn fetch(&self, path: &Path, rev: &str) -> Result<()>;

    /// Check out `rev` as a detached HEAD, overwriting the working tree
    async fn checkout(&self, path: &Path, rev: &str) -> Result<()>;

    /// Discard tracked modifications and untracked files
    async fn reset_hard(&self, path: &Path) -> Result<()>;
}

/// `VersionControl` backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn is_repository(&self, path: &Path) -> Result<bool> {
        is_checkout_root(path).await
    }

    async fn shallow_clone(&self, url: &str, path: &Path) -> Result<()> {
        let (parent, dest) = clone_location(path)?;
        tokio::fs::create_dir_all(&parent).await?;

        info!("Cloning {} into {:?}", url, path);
        git_command_checked(
            &parent,
            &[
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--recurse-submodules",
                url,
                &dest,
            ],
        )
        .await?;
        Ok(())
    }

    async fn head(&self, path: &Path) -> Result<String> {
        if !is_checkout_root(path).await? {
            return Err(CheckoutError::NotARepository {
                path: path.to_path_buf(),
            });
        }
        rev_parse(path, "HEAD").await
    }

    async fn has_commit(&self, path: &Path, rev: &str) -> Result<bool> {
        commit_exists(path, rev).await
    }

    async fn fetch(&self, path: &Path, rev: &str) -> Result<()> {
        debug!("Fetching {} in {:?}", rev, path);
        let output = git_command(path, &["fetch", "--depth", "1", "origin", rev]).await?;
        if output.success {
            return Ok(());
        }

        // Servers that refuse fetching by commit id still serve the branch tips
        warn!(
            "Fetching {} by id failed, fetching remote refs: {}",
            rev,
            output.stderr.trim()
        );
        git_command_checked(path, &["fetch", "origin"]).await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, rev: &str) -> Result<()> {
        info!("Checking out {} in {:?}", rev, path);
        git_command_checked(
            path,
            &[
                "-c",
                "advice.detachedHead=false",
                "checkout",
                "--force",
                "--detach",
                rev,
            ],
        )
        .await?;

        if tokio::fs::try_exists(path.join(".gitmodules")).await? {
            git_command_checked(path, &["submodule", "update", "--init", "--recursive"]).await?;
        }
        Ok(())
    }

    async fn reset_hard(&self, path: &Path) -> Result<()> {
        debug!("Resetting {:?}", path);
        git_command_checked(path, &["reset", "--hard", "HEAD"]).await?;
        git_command_checked(path, &["clean", "-ffdx"]).await?;
        Ok(())
    }
}
