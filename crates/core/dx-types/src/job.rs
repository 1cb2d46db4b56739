//! Per-file work orders and outcome records.

use crate::criterion::CriterionSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the shared summary log inside the data directory.
pub const SUMMARY_LOG_FILE: &str = "summary.jsonl";

/// Work order for a single worker process.
///
/// Sent as the worker's only input and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Dataset (source code) the file belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    /// File name, relative to `data_dir`
    pub file: String,

    /// Criteria to apply; `None` means every record matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<CriterionSpec>>,

    /// Directory holding the downloaded file and the summary log
    pub data_dir: PathBuf,
}

impl JobMessage {
    /// Create a work order for a file in a data directory.
    pub fn new(file: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: None,
            file: file.into(),
            criteria: None,
            data_dir: data_dir.into(),
        }
    }

    /// Set the dataset id.
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Set the criteria to apply.
    pub fn with_criteria(mut self, criteria: Vec<CriterionSpec>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Full path of the file to process.
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.file)
    }

    /// Full path of the shared summary log.
    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(SUMMARY_LOG_FILE)
    }
}

/// Outcome of one fully processed file, written once by its worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Process id of the worker
    pub pid: u32,

    /// File that was processed
    pub file: String,

    /// Record count announced by the reader
    pub total: u64,

    /// Records that matched and were emitted
    pub found: u64,

    /// Records whose emission failed. A failed emission aborts the file
    /// before any summary is written, so logged summaries carry 0.
    pub errors: u64,

    /// Criteria that were applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<CriterionSpec>>,
}

impl JobSummary {
    /// Start an empty summary for a work order.
    pub fn for_job(pid: u32, message: &JobMessage) -> Self {
        Self {
            pid,
            file: message.file.clone(),
            total: 0,
            found: 0,
            errors: 0,
            criteria: message.criteria.clone(),
        }
    }
}
