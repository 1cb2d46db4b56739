//! Error types for the dataset extraction pipeline.
//!
//! This crate provides:
//! - [`DxError`] - Top-level error enum for all pipeline errors
//! - Domain-specific errors ([`TransportError`], [`ReaderError`], [`ProtocolError`], [`WorkerError`])
//! - [`ScheduleError`] - The single fault raised when a job cannot be scheduled
//! - [`FatalWorkerError`] - Worker-side failure that terminates a worker with a non-zero status

use std::fmt;
use thiserror::Error;

/// Top-level error type for the pipeline.
#[derive(Error, Debug)]
pub enum DxError {
    /// Remote listing/download errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// File reader errors (open, decode, cleanup)
    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    /// Inter-process protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Worker process lifecycle errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// A job could not be scheduled
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A caller-supplied callback failed
    #[error("Callback failed: {0}")]
    Callback(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transport errors (listing and downloading dataset files).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to reach the remote source
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Remote file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error during listing or download
    #[error("I/O error: {0}")]
    Io(String),

    /// The subset descriptor cannot be resolved
    #[error("Invalid subset: {0}")]
    InvalidSubset(String),
}

/// Reader errors (opening and streaming tabular files).
#[derive(Error, Debug)]
pub enum ReaderError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),

    /// I/O error during read
    #[error("I/O error: {0}")]
    Io(String),

    /// File is corrupted or not in the expected format
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Temporary artifacts could not be removed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// Errors on the message channel between the orchestrating process and a worker.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Message could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Message could not be deserialized
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Message could not be written to the channel
    #[error("Send failed: {0}")]
    Send(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            ProtocolError::Decode(err.to_string())
        } else {
            ProtocolError::Encode(err.to_string())
        }
    }
}

/// Worker process lifecycle errors, observed by the parent.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker process could not be started
    #[error("Failed to spawn worker '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// I/O failure on the worker's pipes or while waiting for it
    #[error("Worker I/O error: {0}")]
    Io(String),

    /// The worker was terminated by a signal
    #[error("Worker terminated by signal {signal:?} with code {code:?}")]
    Signaled {
        signal: Option<i32>,
        code: Option<i32>,
    },

    /// The worker exceeded its time budget and was killed
    #[error("Worker for '{file}' timed out after {after_secs}s")]
    TimedOut { file: String, after_secs: u64 },
}

/// A job could not be scheduled because its runner failed.
///
/// Not retried; fatal to the orchestration run.
#[derive(Error, Debug)]
#[error("The job for '{file}' could not be scheduled: {source}")]
pub struct ScheduleError {
    /// File the failed job was processing
    pub file: String,

    /// Underlying runner failure
    #[source]
    pub source: Box<DxError>,
}

impl ScheduleError {
    /// Wrap a runner failure for the given file.
    pub fn new(file: impl Into<String>, source: DxError) -> Self {
        Self {
            file: file.into(),
            source: Box::new(source),
        }
    }
}

/// Phase of the worker-side state machine in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStage {
    /// Opening the file and announcing its schema
    Initializing,

    /// Iterating, filtering and emitting records
    Streaming,

    /// Writing the job summary
    Finalizing,
}

impl fmt::Display for WorkerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Finalizing => write!(f, "Finalizing"),
        }
    }
}

/// Failure that terminates a worker process with exit status 1.
///
/// The parent never receives this value: it only observes the exit status.
#[derive(Error, Debug)]
#[error("Worker {pid} failed while {stage}: {reason}")]
pub struct FatalWorkerError {
    /// Process id of the failing worker
    pub pid: u32,

    /// Phase in which the failure happened
    pub stage: WorkerStage,

    /// Human-readable cause
    pub reason: String,
}

impl FatalWorkerError {
    /// Create a fatal error for the given process and stage.
    pub fn new(pid: u32, stage: WorkerStage, reason: impl fmt::Display) -> Self {
        Self {
            pid,
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using DxError.
pub type Result<T> = std::result::Result<T, DxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DxError::Reader(ReaderError::NotFound("data/BIRJ2204.ndjson".to_string()));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_schedule_error_keeps_source() {
        let cause = DxError::Worker(WorkerError::Signaled {
            signal: Some(9),
            code: None,
        });
        let error = DxError::from(ScheduleError::new("BIRJ2204.dbc", cause));

        let text = error.to_string();
        assert!(text.contains("BIRJ2204.dbc"));
        assert!(text.contains("signal"));

        match error {
            DxError::Schedule(e) => {
                assert!(matches!(*e.source, DxError::Worker(WorkerError::Signaled { .. })))
            }
            other => panic!("Expected schedule error, got {other:?}"),
        }
    }

    #[test]
    fn test_fatal_worker_error_display() {
        let error = FatalWorkerError::new(4242, WorkerStage::Streaming, "broken pipe");
        assert_eq!(error.to_string(), "Worker 4242 failed while Streaming: broken pipe");
    }

    #[test]
    fn test_protocol_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(ProtocolError::from(err), ProtocolError::Decode(_)));
    }

    #[test]
    fn test_worker_stage_display() {
        assert_eq!(WorkerStage::Initializing.to_string(), "Initializing");
        assert_eq!(WorkerStage::Finalizing.to_string(), "Finalizing");
    }
}
