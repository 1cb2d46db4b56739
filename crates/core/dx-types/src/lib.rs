//! Core types for the dataset extraction pipeline.
//!
//! This crate provides the foundational types used throughout the system:
//! - [`Record`] - One row of a tabular dataset file
//! - [`Subset`] - Caller-supplied dataset selection (source, regions, period)
//! - [`JobMessage`] / [`JobSummary`] - Per-file work order and outcome record
//! - [`ControlMessage`] - Envelope exchanged with worker processes

pub mod criterion;
pub mod job;
pub mod protocol;
pub mod record;
pub mod subset;

pub use criterion::*;
pub use job::*;
pub use protocol::*;
pub use record::*;
pub use subset::*;
