//! Shared fixtures for unit tests.

use async_trait::async_trait;
use dx_error::{DxError, Result};
use dx_traits::{Emission, ProgressSink, RecordSink};
use dx_types::{Progress, Record};
use parking_lot::Mutex;
use std::time::Duration;

/// Records every emission and progress update, optionally slowly or failing.
#[derive(Default)]
pub struct RecordingSink {
    pub emissions: Mutex<Vec<Emission>>,
    pub progress: Mutex<Vec<Progress>>,
    pub delay: Option<Duration>,
    pub fail_on_record: Option<usize>,
}

impl RecordingSink {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing_on(record_index: usize) -> Self {
        Self {
            fail_on_record: Some(record_index),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.emissions
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Record(r) => Some(r.clone()),
                Emission::Metadata(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn accept(&self, emission: Emission) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let (Some(index), Emission::Record(_)) = (self.fail_on_record, &emission) {
            if self.records().len() == index {
                return Err(DxError::Config("sink rejected record".to_string()));
            }
        }
        self.emissions.lock().push(emission);
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn progress(&self, update: &Progress) -> Result<()> {
        self.progress.lock().push(update.clone());
        Ok(())
    }
}

/// Shell-quote a path for use inside a `sh -c` script.
pub fn quoted(path: &std::path::Path) -> String {
    format!("'{}'", path.display())
}
