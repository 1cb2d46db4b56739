//! Remote file transport trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dx_error::Result;
use dx_types::Subset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file entry as listed by the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name, relative to the source's base directory
    pub name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Last modification time, when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Result of a download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was transferred
    Fetched { bytes: u64 },

    /// The destination already existed; nothing was transferred
    AlreadyPresent,
}

/// Lists and downloads dataset files.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Lists the entries selected by a subset (full form).
    async fn list(&self, subset: &Subset) -> Result<Vec<RemoteEntry>>;

    /// Lists the file names selected by a subset (short form).
    async fn list_names(&self, subset: &Subset) -> Result<Vec<String>> {
        Ok(self
            .list(subset)
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Downloads `file` to `destination`.
    ///
    /// Idempotent: an existing destination is not fetched again.
    async fn get(&self, file: &str, destination: &Path) -> Result<DownloadOutcome>;

    /// Releases the connection to the source.
    async fn close(&self) -> Result<()>;
}
