//! Tabular file reader trait.

use async_trait::async_trait;
use dx_error::Result;
use dx_types::{FieldDescriptor, Record};
use futures::Stream;
use std::path::Path;
use std::pin::Pin;

/// A lazy stream of records in storage order.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// An opened tabular file.
pub struct OpenedTable {
    /// Number of records announced by the file
    pub record_count: u64,

    /// Field schema
    pub fields: Vec<FieldDescriptor>,

    /// Records, read on demand
    pub records: RecordStream,
}

impl std::fmt::Debug for OpenedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedTable")
            .field("record_count", &self.record_count)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Opens tabular files for streaming.
///
/// Readers may create temporary artifacts (e.g. a decompressed copy) while
/// loading; [`TableReader::remove`] deletes them.
#[async_trait]
pub trait TableReader: Send + Sync {
    /// Opens the file at `path`.
    async fn load(&self, path: &Path) -> Result<OpenedTable>;

    /// Deletes temporary artifacts created while loading `path`.
    async fn remove(&self, path: &Path) -> Result<()>;
}
