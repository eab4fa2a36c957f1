//! Error types and Result aliases for Forager.
//!
//! Listing and cache failures abort a scan. Per-file stat failures never
//! surface here; a watcher absorbs them and treats the file as gone.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Forager's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Forager operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Dedup cache error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The governing cancellation token fired.
    #[error("scan cancelled")]
    Cancelled,
}

/// Directory scan errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan directory could not be listed.
    #[error("failed to list directory '{}': {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Dedup cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend failure reported by a cache implementation.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the scan stopped on request rather than on failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl ScanError {
    /// Create a listing error for `path`.
    pub fn list_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ListFailed {
            path: path.into(),
            source,
        }
    }
}

impl CacheError {
    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
