//! CLI argument definitions for dx-worker.

use clap::Parser;
pub use dx_cli_common::LogLevel;
use std::path::PathBuf;

/// Dataset worker process.
///
/// Normally started by `dx-extract`, one process per file. The job message
/// is read from stdin as a single JSON line:
///
///   {"file":"BIRJ2204.ndjson.gz","data_dir":"/data","criteria":[...]}
#[derive(Parser, Debug)]
#[command(name = "dx-worker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory for decompressed temporary tables (defaults to the data directory)
    #[arg(long, env = "DX_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long, value_enum, env = "DX_WORKER_LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,
}
