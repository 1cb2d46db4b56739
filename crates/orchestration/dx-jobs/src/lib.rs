//! Job orchestration for the dataset extraction pipeline.
//!
//! One worker process handles one file. This crate owns everything on both
//! sides of that process boundary:
//!
//! - [`JobOrchestrator`] - Discovers and downloads files, then dispatches them chunk by chunk
//! - [`JobScheduler`] - Runs the files of one chunk, strictly one after another
//! - [`JobRunner`] - Owns one worker process and decodes its output
//! - [`JobProcessor`] - Worker-side streaming, filtering and emission
//! - [`ProtocolWriter`] / [`decode_line`] - The newline-delimited JSON wire format
//! - [`SummaryLog`] - Per-file outcome log shared by all workers
//!
//! # Example
//!
//! ```no_run
//! use dx_jobs::{JobConfig, JobOrchestrator, JsonlSink};
//! use dx_types::Subset;
//! use std::sync::Arc;
//! # use dx_traits::Transport;
//! # async fn run<T: Transport>(transport: T) -> dx_error::Result<()> {
//! let config = JobConfig::new().with_data_dir("/tmp/datasets");
//! let mut orchestrator = JobOrchestrator::new(transport, config);
//!
//! orchestrator.subset(Subset::new("BI").with_regions(["RJ"]), None).await?;
//! let report = orchestrator.exec(Arc::new(JsonlSink::stdout()), None).await?;
//! println!("{} records", report.records_forwarded());
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod entry;
pub mod orchestrator;
pub mod processor;
pub mod protocol;
pub mod runner;
pub mod scheduler;
pub mod sinks;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunk::partition;
pub use config::JobConfig;
pub use entry::WorkerEntry;
pub use orchestrator::{JobOrchestrator, OrchestratorState, RunReport};
pub use processor::JobProcessor;
pub use protocol::{decode_line, ProgressTracker, ProtocolWriter};
pub use runner::{JobCallbacks, JobOutcome, JobRunner};
pub use scheduler::JobScheduler;
pub use sinks::{JsonlSink, SinkStats, StatsSink};
pub use summary::SummaryLog;
