//! Record sinks owned by the caller.

use anyhow::Context;
use async_trait::async_trait;
use dx_error::{ProtocolError, Result};
use dx_traits::{Emission, ProgressSink, RecordSink};
use dx_types::{FieldDescriptor, Progress, WorkerEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes records as JSON lines to an owned writer.
///
/// Metadata is written as a tagged `{"type":"metadata",...}` line when
/// enabled, and skipped otherwise.
pub struct JsonlSink<W> {
    writer: tokio::sync::Mutex<W>,
    include_metadata: bool,
}

impl<W: AsyncWrite + Unpin + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            include_metadata: false,
        }
    }

    /// Also write a metadata line before each file's records.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub async fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .context("Failed to flush output")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonlSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for JsonlSink<W> {
    async fn accept(&self, emission: Emission) -> Result<()> {
        let mut line = match emission {
            Emission::Metadata(_) if !self.include_metadata => return Ok(()),
            Emission::Metadata(fields) => serde_json::to_vec(&WorkerEvent::Metadata { fields }),
            Emission::Record(record) => serde_json::to_vec(&record),
        }
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        line.push(b'\n');

        self.writer
            .lock()
            .await
            .write_all(&line)
            .await
            .context("Failed to write record")?;
        Ok(())
    }
}

/// Counters collected by [`StatsSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Files whose schema was announced
    pub files: u64,

    /// Records received
    pub records: u64,

    /// Progress updates received
    pub progress_updates: u64,
}

/// Counts what it receives without writing anything.
#[derive(Debug, Default)]
pub struct StatsSink {
    files: AtomicU64,
    records: AtomicU64,
    progress_updates: AtomicU64,
    last_fields: Mutex<Vec<FieldDescriptor>>,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            files: self.files.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            progress_updates: self.progress_updates.load(Ordering::Relaxed),
        }
    }

    /// Schema of the most recent file.
    pub fn last_fields(&self) -> Vec<FieldDescriptor> {
        self.last_fields.lock().clone()
    }
}

#[async_trait]
impl RecordSink for StatsSink {
    async fn accept(&self, emission: Emission) -> Result<()> {
        match emission {
            Emission::Metadata(fields) => {
                self.files.fetch_add(1, Ordering::Relaxed);
                *self.last_fields.lock() = fields;
            }
            Emission::Record(_) => {
                self.records.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for StatsSink {
    async fn progress(&self, _update: &Progress) -> Result<()> {
        self.progress_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
