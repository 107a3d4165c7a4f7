//! Termination of AI-review check runs left behind by superseded commits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use warden_core::WardenError;

/// A commit that is no longer the head of its pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleCommit {
    /// GitHub App installation that owns the check runs.
    pub installation_id: u64,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// SHA the stale event was delivered for.
    pub sha: String,
}

/// Capability to terminate still-running AI-review check runs on a commit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckRunTerminator: Send + Sync {
    /// Terminate every active AI-review check run on `commit`.
    ///
    /// Returns the number of check runs that were terminated.
    async fn terminate_stale_check_runs(&self, commit: &StaleCommit) -> Result<usize, WardenError>;
}

/// Spawn a best-effort, time-bounded termination and return immediately.
///
/// The task runs on the ambient tokio runtime and is never joined by the
/// gate; its outcome is only logged. Returns `None` when called outside a
/// runtime, in which case nothing is attempted.
pub fn spawn_detached_termination(
    terminator: Arc<dyn CheckRunTerminator>,
    commit: StaleCommit,
    timeout: Duration,
) -> Option<JoinHandle<()>> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(
            owner = %commit.owner,
            repo = %commit.repo,
            sha = %commit.sha,
            "no async runtime available, stale check runs left untouched"
        );
        return None;
    };

    Some(handle.spawn(async move {
        let outcome = tokio::time::timeout(timeout, terminator.terminate_stale_check_runs(&commit)).await;
        match outcome {
            Ok(Ok(count)) => tracing::info!(
                owner = %commit.owner,
                repo = %commit.repo,
                sha = %commit.sha,
                count,
                "terminated stale check runs"
            ),
            Ok(Err(e)) => tracing::warn!(
                owner = %commit.owner,
                repo = %commit.repo,
                sha = %commit.sha,
                error = %e,
                "failed to terminate stale check runs"
            ),
            Err(_) => tracing::warn!(
                owner = %commit.owner,
                repo = %commit.repo,
                sha = %commit.sha,
                timeout_secs = timeout.as_secs(),
                "stale check-run termination timed out"
            ),
        }
    }))
}
