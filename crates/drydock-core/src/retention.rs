//! Time-bounded artifact retention
//!
//! Trace renderings stay downloadable for a fixed TTL after a violation and
//! are then deleted. The manager is an explicit object so nothing hangs off
//! module-level timer state.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Schedules deletion of retained artifacts
#[derive(Debug, Clone, Default)]
pub struct RetentionManager;

impl RetentionManager {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Delete `path` once `ttl` has elapsed.
    ///
    /// Deletion is idempotent: an artifact already removed (early cleanup,
    /// manual intervention) only produces a debug event.
    pub fn schedule_expiry(&self, path: PathBuf, ttl: Duration) {
        tracing::debug!(path = %path.display(), ttl_secs = ttl.as_secs(), "retention scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            remove_artifact(&path).await;
        });
    }
}

/// Remove an artifact file, tolerating its absence
pub async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact");
        }
    }
}
