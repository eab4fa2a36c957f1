//! Sample forager that reports settled JPEG files.
//!
//! Reads are gated by a semaphore so a burst of settled files cannot
//! exhaust file descriptors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::scan::Forager;

/// Leading bytes shared by every JPEG variant.
pub const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Whether `bytes` starts with the JPEG magic number.
#[must_use]
pub fn is_jpeg_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&JPEG_MAGIC)
}

#[derive(Debug)]
struct Inner {
    read_gate: Semaphore,
    jpegs_found: AtomicU64,
}

/// Forager that logs files whose first bytes look like a JPEG.
#[derive(Debug, Clone)]
pub struct JpegSniffer {
    inner: Arc<Inner>,
}

impl JpegSniffer {
    /// Create a sniffer holding at most `max_open_files` files open at once.
    #[must_use]
    pub fn new(max_open_files: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                read_gate: Semaphore::new(max_open_files.max(1)),
                jpegs_found: AtomicU64::new(0),
            }),
        }
    }

    /// Number of JPEG files reported so far.
    #[must_use]
    pub fn jpegs_found(&self) -> u64 {
        self.inner.jpegs_found.load(Ordering::Relaxed)
    }

    /// Sniff one file. Returns whether it looked like a JPEG.
    pub async fn sniff(&self, token: &CancellationToken, path: &Path) -> bool {
        let permit = tokio::select! {
            biased;
            () = token.cancelled() => return false,
            permit = self.inner.read_gate.acquire() => permit,
        };
        let Ok(_permit) = permit else {
            return false;
        };

        match read_magic(path).await {
            Ok(magic) if is_jpeg_magic(&magic) => {
                self.inner.jpegs_found.fetch_add(1, Ordering::Relaxed);
                tracing::info!(path = %path.display(), "File is probably a jpeg");
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Can't read file");
                false
            }
        }
    }
}

impl Forager for JpegSniffer {
    fn forage(&self, token: CancellationToken, path: PathBuf) -> BoxFuture<'static, ()> {
        let sniffer = self.clone();
        Box::pin(async move {
            sniffer.sniff(&token, &path).await;
        })
    }
}

async fn read_magic(path: &Path) -> std::io::Result<[u8; 3]> {
    let mut file = File::open(path).await?;
    let mut buf = [0u8; 3];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_is_jpeg_magic() {
        assert!(is_jpeg_magic(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]));
        assert!(is_jpeg_magic(&JPEG_MAGIC));
        assert!(!is_jpeg_magic(&[0x89, b'P', b'N', b'G']));
        assert!(!is_jpeg_magic(&[0xFF, 0xD8]));
        assert!(!is_jpeg_magic(&[]));
    }

    #[tokio::test]
    async fn test_sniff_detects_jpeg() {
        let tmp = TempDir::new().unwrap();
        let jpeg = tmp.path().join("photo.jpg");
        let png = tmp.path().join("image.png");
        std::fs::write(&jpeg, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
        std::fs::write(&png, [0x89, b'P', b'N', b'G', 0x0D, 0x0A]).unwrap();

        let sniffer = JpegSniffer::new(1);
        let token = CancellationToken::new();

        assert!(sniffer.sniff(&token, &jpeg).await);
        assert!(!sniffer.sniff(&token, &png).await);
        assert_eq!(sniffer.jpegs_found(), 1);
    }

    #[tokio::test]
    async fn test_sniff_ignores_short_and_missing_files() {
        let tmp = TempDir::new().unwrap();
        let short = tmp.path().join("short.jpg");
        std::fs::write(&short, [0xFF, 0xD8]).unwrap();

        let sniffer = JpegSniffer::new(1);
        let token = CancellationToken::new();

        assert!(!sniffer.sniff(&token, &short).await);
        assert!(!sniffer.sniff(&token, &tmp.path().join("missing.jpg")).await);
        assert_eq!(sniffer.jpegs_found(), 0);
    }

    #[tokio::test]
    async fn test_sniff_cancelled_while_gate_is_held() {
        let tmp = TempDir::new().unwrap();
        let jpeg = tmp.path().join("photo.jpg");
        std::fs::write(&jpeg, JPEG_MAGIC).unwrap();

        let sniffer = JpegSniffer::new(1);
        let _held = sniffer.inner.read_gate.acquire().await.unwrap();

        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel();
            })
        };

        assert!(!sniffer.sniff(&token, &jpeg).await);
        canceller.await.unwrap();
        assert_eq!(sniffer.jpegs_found(), 0);
    }

    #[tokio::test]
    async fn test_forager_impl() {
        let tmp = TempDir::new().unwrap();
        let jpeg = tmp.path().join("photo.jpg");
        std::fs::write(&jpeg, JPEG_MAGIC).unwrap();

        let sniffer = JpegSniffer::new(4);
        sniffer.forage(CancellationToken::new(), jpeg).await;
        assert_eq!(sniffer.jpegs_found(), 1);
    }
}
