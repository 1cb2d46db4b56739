//! dx-worker CLI
//!
//! Processes exactly one dataset file. Reads a job message from stdin,
//! writes protocol messages to stdout and logs to stderr. Exits 0 when the
//! file was fully processed and its summary written, 1 otherwise.

use clap::Parser;
use std::process::ExitCode;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    dx_cli_common::init_logging(args.log_level)?;

    run::execute(args).await
}
