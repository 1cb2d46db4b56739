//! One worker process per job.
//!
//! The runner spawns the worker, hands it the [`JobMessage`] on stdin and
//! decodes its stdout. Decoded messages go through an unbounded channel to a
//! delivery task that awaits each callback in turn, so the worker is never
//! throttled while callbacks still see messages in emission order. The
//! runner only returns once the worker has exited and every queued delivery
//! has settled.

use crate::entry::WorkerEntry;
use crate::protocol::decode_line;
use chrono::{DateTime, Utc};
use dx_error::{DxError, ProtocolError, Result, WorkerError};
use dx_traits::{Emission, ProgressSink, RecordParser, RecordSink};
use dx_types::{ControlMessage, JobMessage, Progress, WorkerEvent};
use serde::Serialize;
use std::io::Write;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Caller-supplied callbacks for one job.
#[derive(Clone, Default)]
pub struct JobCallbacks {
    /// Receives metadata and records
    pub sink: Option<Arc<dyn RecordSink>>,

    /// Applied to every record before it reaches the sink
    pub parser: Option<Arc<dyn RecordParser>>,

    /// Receives progress; without one, progress is drawn on stderr
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl JobCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn RecordParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// How a worker process ended.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    /// File the worker processed
    pub file: String,

    /// Worker process id
    pub pid: Option<u32>,

    /// Exit code; non-zero means the file failed and has no summary entry
    pub exit_code: i32,

    /// Records forwarded to the sink
    pub records: u64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Spawns worker processes and relays their output.
#[derive(Debug, Clone)]
pub struct JobRunner {
    entry: WorkerEntry,
    timeout: Duration,
}

impl JobRunner {
    pub fn new(entry: WorkerEntry, timeout: Duration) -> Self {
        Self { entry, timeout }
    }

    pub fn entry(&self) -> &WorkerEntry {
        &self.entry
    }

    /// Run one job to completion.
    ///
    /// A non-zero exit code is an `Ok` outcome. Termination by a signal, a
    /// timeout, or a failing callback are errors, raised only after all
    /// queued deliveries have settled.
    pub async fn exec(&self, message: &JobMessage, callbacks: &JobCallbacks) -> Result<JobOutcome> {
        let started_at = Utc::now();

        let mut child = self
            .entry
            .command()
            .spawn()
            .map_err(|e| WorkerError::Spawn {
                program: self.entry.program_name(),
                reason: e.to_string(),
            })?;
        let pid = child.id();

        info!(file = %message.file, pid = ?pid, "Spawned worker");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Io("worker stdin is not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Io("worker stdout is not piped".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut pump = tokio::spawn(pump_stdout(stdout, tx, message.file.clone()));
        let delivery = tokio::spawn(deliver(rx, callbacks.clone()));

        send_job(stdin, message).await?;

        let deadline = tokio::time::Instant::now() + self.timeout;

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => Some(status.map_err(|e| WorkerError::Io(e.to_string()))?),
            Err(_) => {
                warn!(
                    file = %message.file,
                    pid = ?pid,
                    timeout_secs = self.timeout.as_secs(),
                    "Worker timed out, killing it"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill worker");
                }
                // A grandchild may still hold the pipe open.
                pump.abort();
                None
            }
        };

        // Output is drained within the same budget as the worker itself.
        if status.is_some() {
            match tokio::time::timeout_at(deadline, &mut pump).await {
                Ok(Ok(Err(e))) => warn!(file = %message.file, error = %e, "Worker output ended abruptly"),
                Ok(Err(e)) => warn!(file = %message.file, error = %e, "Output pump failed"),
                Ok(Ok(Ok(()))) => {}
                Err(_) => {
                    warn!(
                        file = %message.file,
                        pid = ?pid,
                        "Worker exited but its output is still held open, dropping the rest"
                    );
                    pump.abort();
                }
            }
        }

        let report = delivery
            .await
            .map_err(|e| DxError::Callback(format!("delivery task failed: {e}")))?;

        let Some(status) = status else {
            return Err(WorkerError::TimedOut {
                file: message.file.clone(),
                after_secs: self.timeout.as_secs(),
            }
            .into());
        };

        let Some(exit_code) = status.code() else {
            return Err(WorkerError::Signaled {
                signal: exit_signal(&status),
                code: None,
            }
            .into());
        };

        if let Some(failure) = report.failure {
            return Err(failure);
        }

        if exit_code == 0 {
            info!(file = %message.file, records = report.records, "Worker finished");
        } else {
            warn!(file = %message.file, exit_code, "Worker exited with failure");
        }

        Ok(JobOutcome {
            file: message.file.clone(),
            pid,
            exit_code,
            records: report.records,
            started_at,
            completed_at: Utc::now(),
        })
    }
}

async fn send_job(mut stdin: ChildStdin, message: &JobMessage) -> Result<()> {
    let mut payload =
        serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    payload.push(b'\n');

    let written = async {
        stdin.write_all(&payload).await?;
        stdin.shutdown().await
    }
    .await;

    match written {
        Ok(()) => Ok(()),
        // The worker exited without reading; its exit status tells the rest.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            warn!(file = %message.file, "Worker closed stdin before reading the job");
            Ok(())
        }
        Err(e) => Err(WorkerError::Io(e.to_string()).into()),
    }
}

async fn pump_stdout(
    stdout: ChildStdout,
    tx: mpsc::UnboundedSender<ControlMessage>,
    file: String,
) -> Result<()> {
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| WorkerError::Io(e.to_string()))?
    {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(&line) {
            Ok(message) => {
                // Keep reading after the receiver is gone so the worker never blocks.
                let _ = tx.send(message);
            }
            Err(e) => warn!(file = %file, error = %e, "Ignoring undecodable worker output"),
        }
    }

    Ok(())
}

#[derive(Default)]
struct DeliveryReport {
    records: u64,
    failure: Option<DxError>,
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<ControlMessage>,
    callbacks: JobCallbacks,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    while let Some(message) = rx.recv().await {
        if report.failure.is_some() {
            continue;
        }
        if let Err(e) = forward(message, &callbacks, &mut report).await {
            warn!(error = %e, "Callback failed, dropping remaining output");
            report.failure = Some(DxError::Callback(e.to_string()));
        }
    }

    report
}

async fn forward(
    message: ControlMessage,
    callbacks: &JobCallbacks,
    report: &mut DeliveryReport,
) -> Result<()> {
    match message {
        ControlMessage::Event(WorkerEvent::Metadata { fields }) => {
            debug!(fields = fields.len(), "Received metadata");
            if let Some(sink) = &callbacks.sink {
                sink.accept(Emission::Metadata(fields)).await?;
            }
        }
        ControlMessage::Event(WorkerEvent::Progress(progress)) => match &callbacks.progress {
            Some(sink) => sink.progress(&progress).await?,
            None => render_progress(&progress),
        },
        ControlMessage::Record(record) => {
            let record = match &callbacks.parser {
                Some(parser) => parser.parse(record),
                None => record,
            };
            report.records += 1;
            if let Some(sink) = &callbacks.sink {
                sink.accept(Emission::Record(record)).await?;
            }
        }
    }
    Ok(())
}

/// Overwrite a single stderr line; end it once the file is complete.
fn render_progress(progress: &Progress) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(
        stderr,
        "\r[worker {}] {}: {}% ({}/{})",
        progress.pid, progress.file, progress.percent, progress.processed, progress.total
    );
    if progress.percent >= 100 {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
