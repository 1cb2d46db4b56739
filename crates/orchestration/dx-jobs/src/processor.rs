//! Worker-side processing of one file.
//!
//! The processor moves through three stages. Initializing opens the file and
//! announces its schema. Streaming filters records and emits matches and
//! progress. Finalizing appends the job summary. Any failure ends the job
//! with a single [`FatalWorkerError`] and no summary; temporary reader
//! artifacts are removed either way.

use crate::protocol::{ProgressTracker, ProtocolWriter};
use crate::summary::SummaryLog;
use dx_criteria::CriteriaSet;
use dx_error::{FatalWorkerError, WorkerStage};
use dx_traits::TableReader;
use dx_types::{JobMessage, JobSummary, Progress};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

/// Streams one file through the criteria and writes matches to the parent.
pub struct JobProcessor<R: TableReader> {
    reader: R,
    pid: u32,
}

impl<R: TableReader> JobProcessor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pid: std::process::id(),
        }
    }

    /// Override the process id reported in progress and summaries.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Process the file named by `message`.
    pub async fn process<W>(
        &self,
        message: &JobMessage,
        writer: &mut ProtocolWriter<W>,
    ) -> Result<JobSummary, FatalWorkerError>
    where
        W: AsyncWrite + Unpin,
    {
        let path = message.file_path();
        let result = self.run(message, &path, writer).await;

        if let Err(e) = self.reader.remove(&path).await {
            warn!(file = %message.file, error = %e, "Failed to remove temporary artifacts");
        }

        result
    }

    async fn run<W>(
        &self,
        message: &JobMessage,
        path: &Path,
        writer: &mut ProtocolWriter<W>,
    ) -> Result<JobSummary, FatalWorkerError>
    where
        W: AsyncWrite + Unpin,
    {
        let criteria = CriteriaSet::from_specs(message.criteria.as_deref());
        let mut summary = JobSummary::for_job(self.pid, message);

        // Initializing
        let table = self
            .reader
            .load(path)
            .await
            .map_err(|e| self.fatal(WorkerStage::Initializing, e))?;
        summary.total = table.record_count;

        info!(
            file = %message.file,
            records = table.record_count,
            fields = table.fields.len(),
            criteria = %criteria,
            "Opened file"
        );

        writer
            .send_metadata(table.fields)
            .await
            .map_err(|e| self.fatal(WorkerStage::Initializing, e))?;

        // Streaming
        let mut tracker = ProgressTracker::new(table.record_count);
        if let Some(percent) = tracker.start() {
            writer
                .send_progress(self.progress(percent, &tracker, message))
                .await
                .map_err(|e| self.fatal(WorkerStage::Streaming, e))?;
        }

        let mut records = table.records;
        while let Some(record) = records.next().await {
            let record = record.map_err(|e| self.fatal(WorkerStage::Streaming, e))?;

            if let Some(percent) = tracker.advance() {
                writer
                    .send_progress(self.progress(percent, &tracker, message))
                    .await
                    .map_err(|e| self.fatal(WorkerStage::Streaming, e))?;
            }

            if !criteria.check(&record) {
                continue;
            }
            summary.found += 1;

            if let Err(e) = writer.send_record(&record).await {
                return Err(self.fatal(
                    WorkerStage::Streaming,
                    format!("record {} could not be sent: {e}", tracker.processed()),
                ));
            }
        }

        debug!(
            file = %message.file,
            processed = tracker.processed(),
            found = summary.found,
            "Finished streaming"
        );

        // Finalizing
        SummaryLog::new(message.summary_path())
            .append(&summary)
            .await
            .map_err(|e| self.fatal(WorkerStage::Finalizing, e))?;

        info!(
            file = %message.file,
            total = summary.total,
            found = summary.found,
            errors = summary.errors,
            "Job complete"
        );

        Ok(summary)
    }

    fn progress(&self, percent: u8, tracker: &ProgressTracker, message: &JobMessage) -> Progress {
        Progress {
            percent,
            processed: tracker.processed(),
            total: tracker.total(),
            file: message.file.clone(),
            pid: self.pid,
        }
    }

    fn fatal(&self, stage: WorkerStage, reason: impl std::fmt::Display) -> FatalWorkerError {
        FatalWorkerError::new(self.pid, stage, reason)
    }
}
