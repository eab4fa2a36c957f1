//! The callback that consumes settled files.

use std::future::Future;
use std::path::PathBuf;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Consumer of settled files.
///
/// Called at most once per watched file, from that file's watcher task.
/// The scanner does not look at the outcome: error handling, logging and
/// content inspection belong to the implementation. A slow call only
/// delays its own watcher's teardown; no timeout is applied.
///
/// Any `Fn(CancellationToken, PathBuf) -> impl Future<Output = ()>` closure
/// is a `Forager`.
pub trait Forager: Send + Sync + 'static {
    /// Process the file at `path`.
    fn forage(&self, token: CancellationToken, path: PathBuf) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Forager for F
where
    F: Fn(CancellationToken, PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn forage(&self, token: CancellationToken, path: PathBuf) -> BoxFuture<'static, ()> {
        Box::pin(self(token, path))
    }
}
