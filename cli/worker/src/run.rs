//! Main execution logic for dx-worker.

use anyhow::{bail, Context, Result};
use dx_jobs::{JobProcessor, ProtocolWriter};
use dx_reader_ndjson::NdjsonTableReader;
use dx_types::JobMessage;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::args::Cli;

/// Process the job read from stdin.
pub async fn execute(args: Cli) -> Result<ExitCode> {
    let message = read_job().await?;

    let reader = match args.temp_dir {
        Some(dir) => NdjsonTableReader::new().with_temp_dir(dir),
        None => NdjsonTableReader::new(),
    };
    let processor = JobProcessor::new(reader);
    let mut writer = ProtocolWriter::new(tokio::io::stdout());

    match processor.process(&message, &mut writer).await {
        Ok(summary) => {
            info!(
                file = %summary.file,
                total = summary.total,
                found = summary.found,
                "Worker done"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(fatal) => {
            error!(pid = fatal.pid, stage = %fatal.stage, file = %message.file, "{fatal}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn read_job() -> Result<JobMessage> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(&line).context("Invalid job message");
    }

    bail!("No job message on stdin")
}
