//! Inactivity detection for a single file.
//!
//! A watch re-reads the file's metadata every poll interval until the
//! modification time is older than the cutoff, the file disappears, or the
//! token is cancelled.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio_util::sync::CancellationToken;

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The file stopped changing; it should be foraged.
    Settled,
    /// Metadata could not be read, usually because the file was removed.
    Gone,
    /// The token fired before the file settled.
    Cancelled,
}

/// Poll `path` until it settles, disappears, or `token` is cancelled.
///
/// The file is settled once `now - mtime > cutoff`. Metadata errors are
/// absorbed and reported as [`WatchOutcome::Gone`]. Sleeps between polls
/// end early when the token fires.
pub async fn wait_until_settled(
    path: &Path,
    cutoff: Duration,
    poll_interval: Duration,
    token: &CancellationToken,
) -> WatchOutcome {
    loop {
        let modified = match fs::metadata(path).await.and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "File gone before settling");
                return WatchOutcome::Gone;
            }
        };

        if token.is_cancelled() {
            return WatchOutcome::Cancelled;
        }

        let age = file_age(modified, SystemTime::now());
        if age > cutoff {
            return WatchOutcome::Settled;
        }

        tracing::trace!(
            path = %path.display(),
            age_ms = age.as_millis(),
            "File still active"
        );

        tokio::select! {
            biased;
            () = token.cancelled() => return WatchOutcome::Cancelled,
            () = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Time since `modified`, zero when the mtime is in the future.
#[must_use]
pub fn file_age(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}
