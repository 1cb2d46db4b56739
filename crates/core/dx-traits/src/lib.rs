//! Collaborator traits for the dataset extraction pipeline.
//!
//! - [`Transport`] - Lists and downloads dataset files from a remote source
//! - [`TableReader`] - Opens a tabular file and streams its records
//! - [`RecordParser`] - Parent-side record transformation
//! - [`RecordSink`] / [`ProgressSink`] - Caller-supplied delivery callbacks

pub mod parser;
pub mod reader;
pub mod sink;
pub mod transport;

pub use parser::{FieldParser, FieldTransform, RecordParser};
pub use reader::{OpenedTable, RecordStream, TableReader};
pub use sink::{Emission, ProgressSink, RecordSink};
pub use transport::{DownloadOutcome, RemoteEntry, Transport};
