//! Delivery callbacks supplied by the caller.

use async_trait::async_trait;
use dx_error::Result;
use dx_types::{FieldDescriptor, Progress, Record};

/// Something forwarded to the caller's record callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// Schema of the file about to be streamed; always precedes its records
    Metadata(Vec<FieldDescriptor>),

    /// One matching record, after parent-side parsing
    Record(Record),
}

/// Receives metadata and matching records.
///
/// A run is not reported complete until every `accept` call has returned.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn accept(&self, emission: Emission) -> Result<()>;
}

/// Receives per-file progress reports.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn progress(&self, update: &Progress) -> Result<()>;
}
