//! Integration tests for the directory scanner.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use forager::error::CacheError;
use forager::scan::{BoundedCache, FileCache, MemoryCache, Scanner};
use forager::sniff::{JpegSniffer, JPEG_MAGIC};
use forager::Error;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CUTOFF: Duration = Duration::from_millis(300);
const POLL: Duration = Duration::from_millis(50);
const SCAN: Duration = Duration::from_millis(50);

type Calls = Arc<Mutex<Vec<(PathBuf, Instant)>>>;

fn recording_scanner(cache: Option<Arc<dyn FileCache>>) -> (Arc<Scanner>, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let mut builder = Scanner::builder()
        .forager(move |_token: CancellationToken, path: PathBuf| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push((path, Instant::now()));
            }
        })
        .inactivity_cutoff(CUTOFF)
        .poll_interval(POLL)
        .scan_interval(SCAN);
    if let Some(cache) = cache {
        builder = builder.cache(cache);
    }
    (Arc::new(builder.build().unwrap()), calls)
}

fn start(scanner: &Arc<Scanner>, dir: &Path, token: &CancellationToken) -> JoinHandle<Error> {
    let scanner = Arc::clone(scanner);
    let dir = dir.to_path_buf();
    let token = token.clone();
    tokio::spawn(async move {
        scanner
            .scan_for_files(Some(&token), dir)
            .await
            .unwrap_err()
    })
}

async fn stop(scanner: &Scanner, token: &CancellationToken, task: JoinHandle<Error>) -> Error {
    token.cancel();
    let err = task.await.unwrap();
    scanner.wait_for_watchers().await;
    err
}

fn write_with_age(path: &Path, contents: &[u8], age: Duration) {
    std::fs::write(path, contents).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn touch(path: &Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now()).unwrap();
}

fn paths(calls: &Calls) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = calls.lock().iter().map(|(p, _)| p.clone()).collect();
    paths.sort();
    paths
}

/// A path seen by many scan passes is foraged once.
#[tokio::test]
async fn test_each_file_foraged_once() {
    let tmp = TempDir::new().unwrap();
    write_with_age(&tmp.path().join("a.jpg"), b"a", Duration::from_secs(60));
    write_with_age(&tmp.path().join("b.jpg"), b"b", Duration::from_secs(60));

    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let err = stop(&scanner, &token, task).await;

    assert!(err.is_cancelled());
    assert_eq!(
        paths(&calls),
        vec![tmp.path().join("a.jpg"), tmp.path().join("b.jpg")]
    );
    let stats = scanner.stats();
    assert!(stats.scan_passes >= 3, "expected several passes: {stats:?}");
    assert_eq!(stats.files_discovered, 2);
    assert_eq!(stats.files_foraged, 2);
}

/// Files created after the scan started are discovered on a later pass.
#[tokio::test]
async fn test_new_file_discovered_and_settled() {
    let tmp = TempDir::new().unwrap();
    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let path = tmp.path().join("upload.jpg");
    std::fs::write(&path, b"fresh").unwrap();
    let written = Instant::now();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    stop(&scanner, &token, task).await;

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, path);
    assert!(
        calls[0].1.duration_since(written) >= Duration::from_millis(250),
        "foraged before the cutoff elapsed"
    );
}

/// A file touched more often than the cutoff is held back until it goes quiet.
#[tokio::test]
async fn test_busy_file_waits_until_quiet() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("growing.bin");
    std::fs::write(&path, b"chunk").unwrap();

    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        touch(&path);
        assert!(calls.lock().is_empty(), "foraged while still being written");
    }
    let last_write = Instant::now();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    stop(&scanner, &token, task).await;

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    let delay = calls[0].1.duration_since(last_write);
    assert!(delay >= Duration::from_millis(250), "too early: {delay:?}");
    assert!(delay <= CUTOFF + POLL + Duration::from_millis(400), "too late: {delay:?}");
}

/// A file removed before it settles is never foraged.
#[tokio::test]
async fn test_removed_file_not_foraged() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("temp.part");
    std::fs::write(&path, b"partial").unwrap();

    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::remove_file(&path).unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    stop(&scanner, &token, task).await;

    assert!(calls.lock().is_empty());
    let stats = scanner.stats();
    assert_eq!(stats.files_discovered, 1);
    assert_eq!(stats.files_gone, 1);
}

/// Cancelling before anything settles yields the cancellation error and no calls.
#[tokio::test]
async fn test_cancel_before_settle() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.jpg"), b"fresh").unwrap();

    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let err = stop(&scanner, &token, task).await;

    assert!(matches!(err, Error::Cancelled));
    assert!(calls.lock().is_empty());
    assert_eq!(scanner.stats().watches_cancelled, 1);
    assert_eq!(scanner.active_watches(), 0);
}

/// Sub-directories are never watched, however old they are.
#[tokio::test]
async fn test_subdirectories_ignored() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_with_age(&nested.join("inner.jpg"), b"x", Duration::from_secs(60));

    let (scanner, calls) = recording_scanner(None);
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(400)).await;
    stop(&scanner, &token, task).await;

    assert!(calls.lock().is_empty());
    assert_eq!(scanner.stats().files_discovered, 0);
}

/// A caller-supplied cache decides what counts as new.
#[tokio::test]
async fn test_shared_cache_skips_known_paths() {
    let tmp = TempDir::new().unwrap();
    write_with_age(&tmp.path().join("old.jpg"), b"o", Duration::from_secs(60));
    write_with_age(&tmp.path().join("new.jpg"), b"n", Duration::from_secs(60));

    let cache = Arc::new(MemoryCache::new());
    cache.add(&tmp.path().join("old.jpg")).unwrap();

    let (scanner, calls) = recording_scanner(Some(cache.clone()));
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop(&scanner, &token, task).await;

    assert_eq!(paths(&calls), vec![tmp.path().join("new.jpg")]);
    assert_eq!(cache.len(), 2);
}

/// An expiring cache lets a still-present file be foraged again.
#[tokio::test]
async fn test_expiring_cache_reforages() {
    let tmp = TempDir::new().unwrap();
    write_with_age(&tmp.path().join("a.jpg"), b"a", Duration::from_secs(60));

    let cache = BoundedCache::new(None, Some(Duration::from_millis(200))).unwrap();
    let (scanner, calls) = recording_scanner(Some(Arc::new(cache)));
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(800)).await;
    stop(&scanner, &token, task).await;

    assert!(calls.lock().len() >= 2, "expected the path to be foraged again");
}

struct CountingFailCache {
    adds: AtomicUsize,
}

impl FileCache for CountingFailCache {
    fn contains(&self, _path: &Path) -> Result<bool, CacheError> {
        Err(CacheError::backend("lookup failed"))
    }

    fn add(&self, _path: &Path) -> Result<(), CacheError> {
        self.adds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A failing cache aborts the scan on the first pass.
#[tokio::test]
async fn test_cache_error_aborts_scan() {
    let tmp = TempDir::new().unwrap();
    write_with_age(&tmp.path().join("a.jpg"), b"a", Duration::from_secs(60));

    let cache = Arc::new(CountingFailCache {
        adds: AtomicUsize::new(0),
    });
    let (scanner, calls) = recording_scanner(Some(cache.clone()));

    let err = scanner.scan_for_files(None, tmp.path()).await.unwrap_err();

    assert!(matches!(err, Error::Cache(_)));
    assert_eq!(cache.adds.load(Ordering::Relaxed), 0);
    assert_eq!(scanner.active_watches(), 0);
    assert!(calls.lock().is_empty());
}

/// Without a token the scan keeps running.
#[tokio::test]
async fn test_no_token_never_cancels() {
    let tmp = TempDir::new().unwrap();
    write_with_age(&tmp.path().join("a.jpg"), b"a", Duration::from_secs(60));

    let (scanner, calls) = recording_scanner(None);
    let result = tokio::time::timeout(
        Duration::from_millis(300),
        scanner.scan_for_files(None, tmp.path()),
    )
    .await;

    assert!(result.is_err(), "scan returned without cancellation");
    scanner.wait_for_watchers().await;
    assert_eq!(paths(&calls), vec![tmp.path().join("a.jpg")]);
}

/// The sample JPEG sniffer plugs in as a forager.
#[tokio::test]
async fn test_jpeg_sniffer_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let mut jpeg = JPEG_MAGIC.to_vec();
    jpeg.extend_from_slice(&[0xE0, 0x00, 0x10]);
    write_with_age(&tmp.path().join("photo.jpg"), &jpeg, Duration::from_secs(60));
    write_with_age(&tmp.path().join("notes.txt"), b"hello", Duration::from_secs(60));

    let sniffer = JpegSniffer::new(1);
    let scanner = Arc::new(
        Scanner::builder()
            .forager(sniffer.clone())
            .inactivity_cutoff(CUTOFF)
            .poll_interval(POLL)
            .scan_interval(SCAN)
            .build()
            .unwrap(),
    );
    let token = CancellationToken::new();
    let task = start(&scanner, tmp.path(), &token);

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop(&scanner, &token, task).await;

    assert_eq!(sniffer.jpegs_found(), 1);
    assert_eq!(scanner.stats().files_foraged, 2);
}
