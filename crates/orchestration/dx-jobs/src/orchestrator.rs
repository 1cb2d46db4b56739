//! Discovery, download and chunked dispatch.

use crate::chunk::partition;
use crate::config::JobConfig;
use crate::entry::WorkerEntry;
use crate::runner::{JobCallbacks, JobOutcome};
use crate::scheduler::JobScheduler;
use chrono::{DateTime, Utc};
use dx_criteria::CriteriaSet;
use dx_error::{Result, TransportError};
use dx_traits::{DownloadOutcome, ProgressSink, RecordParser, RecordSink, Transport};
use dx_types::{CriterionSpec, Subset};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorState {
    /// Nothing pending
    Idle,

    /// Files discovered and partitioned, waiting for `exec`
    SubsetDefined,

    /// Downloading or dispatching
    Executing,
}

/// Summary of one `exec` call.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Files selected by the subset
    pub files_discovered: usize,

    /// Files transferred from the source
    pub downloaded: usize,

    /// Files already in the data directory
    pub already_present: usize,

    /// Bytes transferred
    pub bytes_downloaded: u64,

    /// One outcome per dispatched file, in dispatch order
    pub jobs: Vec<JobOutcome>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunReport {
    fn new(files_discovered: usize) -> Self {
        Self {
            files_discovered,
            downloaded: 0,
            already_present: 0,
            bytes_downloaded: 0,
            jobs: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Records forwarded to the sink across all files.
    pub fn records_forwarded(&self) -> u64 {
        self.jobs.iter().map(|j| j.records).sum()
    }

    /// Jobs whose worker exited with a non-zero code.
    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|j| !j.succeeded())
    }

    /// True when every dispatched worker exited cleanly.
    pub fn succeeded(&self) -> bool {
        self.jobs.iter().all(JobOutcome::succeeded)
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

/// Drives a subset through download and dispatch.
///
/// `subset` discovers and partitions the files; `exec` downloads them all,
/// then runs the chunks in order. Chunks, and the files inside a chunk, run
/// one at a time.
pub struct JobOrchestrator<T: Transport> {
    config: JobConfig,
    transport: T,
    criteria: Option<Vec<CriterionSpec>>,
    progress: Option<Arc<dyn ProgressSink>>,
    state: OrchestratorState,
    subset: Option<Subset>,
    parser: Option<Arc<dyn RecordParser>>,
    files: Vec<String>,
    chunks: Vec<Vec<String>>,
}

impl<T: Transport> JobOrchestrator<T> {
    pub fn new(transport: T, config: JobConfig) -> Self {
        Self {
            config,
            transport,
            criteria: None,
            progress: None,
            state: OrchestratorState::Idle,
            subset: None,
            parser: None,
            files: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Filter records with these criteria. An empty set keeps every record.
    pub fn with_criteria(mut self, criteria: &CriteriaSet) -> Self {
        self.criteria = (!criteria.is_empty()).then(|| criteria.to_specs());
        self
    }

    /// Send worker progress here instead of drawing it on stderr.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Files pending dispatch, deduplicated, in discovery order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn chunks(&self) -> &[Vec<String>] {
        &self.chunks
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Discover the files of a subset and partition them into chunks.
    ///
    /// Discards any state left from a previous subset.
    pub async fn subset(
        &mut self,
        subset: Subset,
        parser: Option<Arc<dyn RecordParser>>,
    ) -> Result<&[String]> {
        self.reset();

        let listed = self.transport.list_names(&subset).await?;
        let listed_count = listed.len();

        let mut seen = HashSet::new();
        let files: Vec<String> = listed
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        self.chunks = partition(self.config.chunk_size(), &files);
        self.files = files;
        self.parser = parser;
        self.subset = Some(subset);
        self.state = OrchestratorState::SubsetDefined;

        info!(
            files = self.files.len(),
            duplicates = listed_count - self.files.len(),
            chunks = self.chunks.len(),
            "Subset defined"
        );

        Ok(&self.files)
    }

    /// Download every pending file, then dispatch the chunks.
    ///
    /// Pending state is cleared whether the run succeeds or fails. Without a
    /// defined subset this does nothing and returns an empty report.
    pub async fn exec(
        &mut self,
        sink: Arc<dyn RecordSink>,
        entry: Option<WorkerEntry>,
    ) -> Result<RunReport> {
        if self.state != OrchestratorState::SubsetDefined {
            warn!(state = ?self.state, "exec called without a defined subset");
            return Ok(RunReport::new(0));
        }

        self.state = OrchestratorState::Executing;
        let result = self.run(sink, entry).await;
        self.reset();
        result
    }

    async fn run(&self, sink: Arc<dyn RecordSink>, entry: Option<WorkerEntry>) -> Result<RunReport> {
        let mut report = RunReport::new(self.files.len());

        tokio::fs::create_dir_all(&self.config.data_dir)
            .await
            .map_err(|e| {
                TransportError::Io(format!(
                    "cannot create {}: {e}",
                    self.config.data_dir.display()
                ))
            })?;

        for file in &self.files {
            let destination = self.config.data_dir.join(file);
            match self.transport.get(file, &destination).await? {
                DownloadOutcome::Fetched { bytes } => {
                    debug!(file = %file, bytes, "Downloaded");
                    report.downloaded += 1;
                    report.bytes_downloaded += bytes;
                }
                DownloadOutcome::AlreadyPresent => {
                    debug!(file = %file, "Already present");
                    report.already_present += 1;
                }
            }
        }

        info!(
            downloaded = report.downloaded,
            already_present = report.already_present,
            "Download phase complete"
        );

        let entry = entry.unwrap_or_else(WorkerEntry::locate);
        let dataset = self.subset.as_ref().map(|s| s.source.as_str());
        let callbacks = JobCallbacks {
            sink: Some(sink),
            parser: self.parser.clone(),
            progress: self.progress.clone(),
        };

        for (index, chunk) in self.chunks.iter().enumerate() {
            info!(
                chunk = index + 1,
                of = self.chunks.len(),
                files = chunk.len(),
                "Dispatching chunk"
            );
            let mut scheduler = JobScheduler::new(&self.config, self.criteria.clone());
            let outcomes = scheduler.exec(chunk, &entry, dataset, &callbacks).await?;
            report.jobs.extend(outcomes);
        }

        report.completed_at = Some(Utc::now());
        info!(
            jobs = report.jobs.len(),
            failed = report.failed_jobs().count(),
            records = report.records_forwarded(),
            "Run complete"
        );
        Ok(report)
    }

    fn reset(&mut self) {
        self.files.clear();
        self.chunks.clear();
        self.parser = None;
        self.subset = None;
        self.state = OrchestratorState::Idle;
    }
}
