//! Shared per-file summary log.

use anyhow::Context;
use dx_error::{DxError, ProtocolError, Result};
use dx_types::{JobSummary, SUMMARY_LOG_FILE};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Newline-delimited JSON log with one [`JobSummary`] per completed file.
///
/// Each append is a single whole-line write; workers run one at a time, so
/// entries never interleave.
#[derive(Debug, Clone)]
pub struct SummaryLog {
    path: PathBuf,
}

impl SummaryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The summary log of a data directory.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(SUMMARY_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one summary line.
    pub async fn append(&self, summary: &JobSummary) -> Result<()> {
        let mut line =
            serde_json::to_vec(summary).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open summary log {}", self.path.display()))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush().await.context("Failed to flush summary log")?;
        Ok(())
    }

    /// Read every entry. A missing log has no entries.
    pub async fn read_all(&self) -> Result<Vec<JobSummary>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read {}", self.path.display()))
                    .into())
            }
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    DxError::from(ProtocolError::Decode(format!(
                        "{}:{}: {e}",
                        self.path.display(),
                        index + 1
                    )))
                })
            })
            .collect()
    }
}
