//! dx-extract CLI
//!
//! Downloads the files of a dataset subset from a mirror and extracts the
//! records matching the given criteria, one worker process per file.

use clap::Parser;
use dx_cli_common::{format_bytes, format_elapsed, format_number};

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Stdout carries extracted records; logs go to stderr
    dx_cli_common::init_logging(args.log_level)?;

    let recap = run::execute(args).await?;
    let report = &recap.report;

    eprintln!();
    eprintln!("Extraction completed:");
    eprintln!("  Files discovered:  {}", format_number(report.files_discovered as u64));
    eprintln!("  Files downloaded:  {}", format_number(report.downloaded as u64));
    eprintln!("  Already present:   {}", format_number(report.already_present as u64));
    eprintln!("  Bytes downloaded:  {}", format_bytes(report.bytes_downloaded));
    eprintln!("  Jobs:              {}", format_number(report.jobs.len() as u64));
    eprintln!("  Records forwarded: {}", format_number(report.records_forwarded()));
    if let Some(stats) = recap.stats {
        eprintln!("  Files announced:   {}", format_number(stats.files));
        eprintln!("  Progress updates:  {}", format_number(stats.progress_updates));
    }
    if let Some(duration) = report.duration() {
        eprintln!("  Duration:          {}", format_elapsed(duration));
    }

    let failed: Vec<_> = report.failed_jobs().collect();
    if !failed.is_empty() {
        eprintln!("  Failed jobs:       {}", failed.len());
        for job in failed {
            eprintln!("  Failed: {} (exit code {})", job.file, job.exit_code);
        }
        std::process::exit(4); // Partial failure
    }

    Ok(())
}
