//! Shared utilities for the dataset extraction command-line tools.
//!
//! Used by both `dx-extract` and `dx-worker`.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_elapsed, format_number};
pub use logging::init_logging;
