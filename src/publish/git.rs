//! Commit and push published outputs
//!
//! Mirrors the operator workflow: stage everything, commit (an empty
//! commit attempt is tolerated), then push under the same retry policy
//! the fetch path uses. Push exhaustion is fatal: data keeps arriving
//! but can no longer leave the machine, which an operator must see.

use crate::publish::PublishError;
use crate::retry::{FixedBackoff, RetryPolicy};
use std::path::Path;
use tokio::process::Command;

async fn run_git(dir: &Path, args: &[&str]) -> Result<(), PublishError> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .await
        .map_err(|e| PublishError::Git(format!("failed to spawn git: {}", e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(PublishError::Git(format!(
            "git {} exited with {}",
            args.first().unwrap_or(&""),
            status
        )))
    }
}

/// Stage, commit, and push the output checkout.
///
/// No-op when the directory is not a git checkout. Commit failures are
/// logged and tolerated (usually "nothing to commit"); push failures
/// are retried and exhaust into [`PublishError::PushExhausted`].
pub async fn commit_and_push(dir: &Path, policy: RetryPolicy) -> Result<(), PublishError> {
    if !dir.join(".git").is_dir() {
        log::info!("'{}' is not a git checkout, skipping push", dir.display());
        return Ok(());
    }

    run_git(dir, &["add", "."]).await?;

    if let Err(e) = run_git(dir, &["commit", "-m", "Updating data."]).await {
        log::warn!("Commit skipped: {}", e);
    }

    let mut backoff = FixedBackoff::new(policy);
    loop {
        match run_git(dir, &["push"]).await {
            Ok(()) => {
                log::info!("📤 Pushed updated outputs");
                return Ok(());
            }
            Err(e) => {
                log::warn!("Push failed: {}", e);
                if backoff.sleep().await.is_err() {
                    return Err(PublishError::PushExhausted);
                }
            }
        }
    }
}
