//! Sequential dispatch of the files in one chunk.

use crate::config::JobConfig;
use crate::entry::WorkerEntry;
use crate::runner::{JobCallbacks, JobOutcome, JobRunner};
use dx_error::{Result, ScheduleError};
use dx_types::{CriterionSpec, JobMessage};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

/// Runs the files of one chunk, one worker at a time.
///
/// One scheduler is built per chunk; its counter of processed files starts
/// at zero and only moves forward.
#[derive(Debug)]
pub struct JobScheduler {
    max_concurrency: usize,
    criteria: Option<Vec<CriterionSpec>>,
    data_dir: PathBuf,
    worker_timeout: Duration,
    files_processed: usize,
}

impl JobScheduler {
    pub fn new(config: &JobConfig, criteria: Option<Vec<CriterionSpec>>) -> Self {
        Self {
            max_concurrency: config.chunk_size(),
            criteria,
            data_dir: config.data_dir.clone(),
            worker_timeout: config.worker_timeout,
            files_processed: 0,
        }
    }

    /// Files completed by this scheduler so far.
    pub fn files_processed(&self) -> usize {
        self.files_processed
    }

    /// Process every remaining file of the chunk in list order.
    ///
    /// Each worker must exit before the next is spawned. A runner failure
    /// stops the chunk and is returned as a [`ScheduleError`].
    pub async fn exec(
        &mut self,
        files: &[String],
        entry: &WorkerEntry,
        dataset: Option<&str>,
        callbacks: &JobCallbacks,
    ) -> Result<Vec<JobOutcome>> {
        let runner = JobRunner::new(entry.clone(), self.worker_timeout);
        let mut outcomes = Vec::with_capacity(files.len().saturating_sub(self.files_processed));

        debug!(
            files = files.len(),
            max_concurrency = self.max_concurrency,
            "Scheduling chunk"
        );

        while let Some(file) = files.get(self.files_processed) {
            let message = self.job_for(file, dataset);

            let outcome = match runner.exec(&message, callbacks).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(file = %file, error = %e, "Job could not be scheduled");
                    return Err(ScheduleError::new(file.clone(), e).into());
                }
            };

            self.files_processed += 1;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn job_for(&self, file: &str, dataset: Option<&str>) -> JobMessage {
        let mut message = JobMessage::new(file, &self.data_dir);
        if let Some(dataset) = dataset {
            message = message.with_dataset(dataset);
        }
        if let Some(criteria) = &self.criteria {
            message = message.with_criteria(criteria.clone());
        }
        message
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{quoted, RecordingSink};
    use dx_error::{DxError, WorkerError};
    use std::sync::Arc;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_files_run_one_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("trace.log");
        let entry = WorkerEntry::shell(format!(
            "echo start >> {log}; sleep 0.1; echo end >> {log}",
            log = quoted(&log)
        ));

        let config = JobConfig::new().with_data_dir(dir.path());
        let mut scheduler = JobScheduler::new(&config, None);
        let outcomes = scheduler
            .exec(&files(&["a", "b", "c"]), &entry, None, &JobCallbacks::new())
            .await
            .unwrap();

        assert_eq!(scheduler.files_processed(), 3);
        let order: Vec<&str> = outcomes.iter().map(|o| o.file.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);

        let trace = std::fs::read_to_string(&log).unwrap();
        let events: Vec<&str> = trace.lines().collect();
        assert_eq!(events, vec!["start", "end", "start", "end", "start", "end"]);
    }

    #[tokio::test]
    async fn test_job_messages_carry_chunk_settings() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let callbacks = JobCallbacks::new().with_sink(sink.clone());
        let criteria = vec![dx_types::CriterionSpec::String {
            field: "UF".to_string(),
            value: "RJ".to_string(),
        }];

        let config = JobConfig::new().with_data_dir(dir.path());
        let mut scheduler = JobScheduler::new(&config, Some(criteria));
        let entry = WorkerEntry::shell(r#"read line; printf '%s\n' "$line""#);
        scheduler
            .exec(&files(&["a", "b"]), &entry, Some("BI"), &callbacks)
            .await
            .unwrap();

        let messages: Vec<JobMessage> = sink
            .records()
            .into_iter()
            .map(|r| serde_json::from_value(serde_json::Value::Object(r)).unwrap())
            .collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].file, "a");
        assert_eq!(messages[1].file, "b");
        for message in &messages {
            assert_eq!(message.dataset.as_deref(), Some("BI"));
            assert_eq!(message.data_dir, dir.path());
            assert_eq!(message.criteria.as_ref().map(Vec::len), Some(1));
        }
    }

    #[tokio::test]
    async fn test_runner_failure_stops_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("trace.log");
        let entry = WorkerEntry::shell(format!("echo ran >> {}; kill -9 $$", quoted(&log)));

        let config = JobConfig::new().with_data_dir(dir.path());
        let mut scheduler = JobScheduler::new(&config, None);
        let result = scheduler
            .exec(&files(&["a", "b"]), &entry, None, &JobCallbacks::new())
            .await;

        match result {
            Err(DxError::Schedule(fault)) => {
                assert_eq!(fault.file, "a");
                assert!(matches!(
                    *fault.source,
                    DxError::Worker(WorkerError::Signaled { .. })
                ));
            }
            other => panic!("Expected schedule error, got {other:?}"),
        }
        assert_eq!(scheduler.files_processed(), 0);
        assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_exit_code_does_not_stop_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::new().with_data_dir(dir.path());
        let mut scheduler = JobScheduler::new(&config, None);

        let outcomes = scheduler
            .exec(
                &files(&["a", "b"]),
                &WorkerEntry::shell("exit 1"),
                None,
                &JobCallbacks::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.exit_code == 1));
    }

    #[tokio::test]
    async fn test_empty_chunk() {
        let config = JobConfig::new();
        let mut scheduler = JobScheduler::new(&config, None);
        let outcomes = scheduler
            .exec(&[], &WorkerEntry::shell("exit 0"), None, &JobCallbacks::new())
            .await
            .unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(scheduler.files_processed(), 0);
    }
}
