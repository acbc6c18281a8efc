//! Git command execution utilities

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{CheckoutError, Result};

/// Output from a git command
#[derive(Debug)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Execute a git command in the specified directory
pub async fn git_command(dir: &Path, args: &[&str]) -> Result<GitOutput> {
    debug!("Running git {:?} in {:?}", args, dir);

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        // Never block on a credential prompt
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CheckoutError::git_failed_with_source("Failed to execute git command", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    trace!("git stdout: {}", stdout);
    if !stderr.is_empty() {
        trace!("git stderr: {}", stderr);
    }

    Ok(GitOutput {
        stdout,
        stderr,
        success: output.status.success(),
    })
}

/// Execute a git command and return error if it fails
pub async fn git_command_checked(dir: &Path, args: &[&str]) -> Result<String> {
    let output = git_command(dir, args).await?;

    if !output.success {
        return Err(CheckoutError::git_failed(format!(
            "git {} failed: {}",
            args.join(" "),
            output.stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Check if `path` is the top of a git working tree with at least one commit
pub async fn is_checkout_root(path: &Path) -> Result<bool> {
    if !tokio::fs::try_exists(path.join(".git")).await? {
        return Ok(false);
    }
    let output = git_command(path, &["rev-parse", "--verify", "HEAD"]).await?;
    Ok(output.success)
}

/// Resolve a revision to a full commit hash
pub async fn rev_parse(repo_path: &Path, rev: &str) -> Result<String> {
    let output = git_command_checked(repo_path, &["rev-parse", "--verify", rev]).await?;
    Ok(output.trim().to_string())
}

/// Check if a commit object is present locally
pub async fn commit_exists(repo_path: &Path, rev: &str) -> Result<bool> {
    let output = git_command(
        repo_path,
        &["cat-file", "-e", &format!("{}^{{commit}}", rev)],
    )
    .await?;
    Ok(output.success)
}

/// Split a target path into the directory git runs in and the clone destination
pub(crate) fn clone_location(path: &Path) -> Result<(PathBuf, String)> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let dest = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| CheckoutError::git_failed(format!("Invalid clone path: {:?}", path)))?;
    Ok((parent, dest))
}
