//! Configuration for orchestration runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default number of files per chunk.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default time budget for a single worker process.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Configuration for a job orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Files per chunk.
    ///
    /// Chunks are dispatched one at a time and so are the files inside them;
    /// this value only sizes the chunks.
    pub max_concurrency: usize,

    /// Directory for downloaded files and the summary log
    pub data_dir: PathBuf,

    /// A worker still running after this long is killed
    #[serde(with = "humantime_serde")]
    pub worker_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            data_dir: PathBuf::from("./"),
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
        }
    }
}

impl JobConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of files per chunk.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the per-worker timeout.
    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Chunk size actually used; zero is clamped to one.
    pub fn chunk_size(&self) -> usize {
        if self.max_concurrency == 0 {
            warn!("max_concurrency is 0, using 1");
            return 1;
        }
        self.max_concurrency
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }
        if self.worker_timeout.is_zero() {
            return Err("worker_timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Serde helper for Duration serialization.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
