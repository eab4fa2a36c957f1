//! Configuration settings and validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::scan::{
    BoundedCache, Scanner, ScannerBuilder, DEFAULT_INACTIVITY_CUTOFF, DEFAULT_POLL_INTERVAL,
    DEFAULT_SCAN_INTERVAL,
};
use crate::{Error, Result};

/// Main configuration for the forager binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory to scan for new files.
    pub scan_dir: PathBuf,

    /// How long a file must stop changing before it is foraged.
    /// Must be non-zero here; the library builder instead maps zero to the 5 s default.
    pub inactivity_cutoff: Duration,

    /// Delay between directory scan passes.
    pub scan_interval: Duration,

    /// Delay between metadata reads of a watched file.
    pub poll_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,

    /// Maximum number of remembered paths. `None` keeps every path.
    pub cache_capacity: Option<u64>,

    /// Forget remembered paths after this long. `None` never forgets.
    pub cache_ttl: Option<Duration>,

    /// Number of files the sniffer may hold open at once.
    pub max_open_files: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_dir: PathBuf::from("."),
            inactivity_cutoff: DEFAULT_INACTIVITY_CUTOFF,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: "info".to_string(),
            log_json: false,
            cache_capacity: None,
            cache_ttl: None,
            max_open_files: 1,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scan_dir.as_os_str().is_empty() {
            return Err(Error::config("scan_dir cannot be empty"));
        }

        if self.inactivity_cutoff.is_zero() {
            return Err(Error::config("inactivity_cutoff cannot be 0"));
        }

        if self.scan_interval.is_zero() {
            return Err(Error::config("scan_interval cannot be 0"));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::config("poll_interval cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.cache_capacity == Some(0) {
            return Err(Error::config("cache_capacity cannot be 0"));
        }

        if self.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(Error::config("cache_ttl cannot be 0"));
        }

        if self.max_open_files == 0 {
            return Err(Error::config("max_open_files cannot be 0"));
        }

        Ok(())
    }

    /// Whether the dedup cache should evict entries.
    #[must_use]
    pub const fn wants_bounded_cache(&self) -> bool {
        self.cache_capacity.is_some() || self.cache_ttl.is_some()
    }

    /// Start a scanner builder carrying these timings and cache bounds.
    ///
    /// The forager still has to be set by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounded cache cannot be created.
    pub fn scanner_builder(&self) -> Result<ScannerBuilder> {
        let mut builder = Scanner::builder()
            .inactivity_cutoff(self.inactivity_cutoff)
            .scan_interval(self.scan_interval)
            .poll_interval(self.poll_interval);

        if self.wants_bounded_cache() {
            builder = builder.cache(BoundedCache::new(self.cache_capacity, self.cache_ttl)?);
        }

        Ok(builder)
    }
}
