//! NDJSON table reader implementation.

use async_compression::tokio::bufread::GzipDecoder;
use async_stream::try_stream;
use async_trait::async_trait;
use dx_error::{DxError, ReaderError, Result};
use dx_traits::{OpenedTable, TableReader};
use dx_types::{FieldDescriptor, Record};
use futures::Stream;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Extension added to decompressed temporary tables.
const ARTIFACT_EXTENSION: &str = "tmp";

/// Compression type detected from file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Detect compression from a file name.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".gz") || name.ends_with(".gzip") {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

/// Reads NDJSON tables from local files.
#[derive(Debug, Clone, Default)]
pub struct NdjsonTableReader {
    temp_dir: Option<PathBuf>,
}

impl NdjsonTableReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put decompressed tables in `dir` instead of next to the source.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Path of the decompressed table for a compressed source, if any.
    pub fn artifact_path(&self, path: &Path) -> Option<PathBuf> {
        if Compression::from_path(path) == Compression::None {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy();
        let name = format!("{stem}.{ARTIFACT_EXTENSION}");
        let dir = match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Some(dir.join(name))
    }

    /// Decompress `source` into `artifact`, replacing any leftover artifact.
    ///
    /// Output goes to a `.part` sibling first, so `artifact` only ever holds a
    /// complete table.
    async fn decompress(&self, source: &Path, artifact: &Path) -> Result<()> {
        let input = open(source).await?;
        let partial = partial_path(artifact);
        let mut decoder = GzipDecoder::new(BufReader::with_capacity(8192, input));
        let mut output = File::create(&partial)
            .await
            .map_err(|e| ReaderError::Io(format!("Failed to create '{}': {e}", partial.display())))?;

        let copied = async {
            tokio::io::copy(&mut decoder, &mut output).await?;
            output.flush().await
        }
        .await;
        drop(output);

        if let Err(e) = copied {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(ReaderError::Decompression(format!(
                "Failed to decompress '{}': {e}",
                source.display()
            ))
            .into());
        }

        tokio::fs::rename(&partial, artifact).await.map_err(|e| {
            ReaderError::Io(format!("Failed to move '{}' into place: {e}", artifact.display()))
        })?;

        debug!(source = %source.display(), artifact = %artifact.display(), "Decompressed table");
        Ok(())
    }

    /// Count records and read the first one.
    async fn scan(&self, path: &Path) -> Result<(u64, Option<Record>)> {
        let mut lines = BufReader::new(open(path).await?).lines();
        let mut count = 0u64;
        let mut first = None;
        let mut line_number = 0u64;

        while let Some(line) = lines.next_line().await.map_err(|e| read_error(path, e))? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            if first.is_none() {
                first = Some(parse_record(&line, path, line_number)?);
            }
            count += 1;
        }

        Ok((count, first))
    }
}

#[async_trait]
impl TableReader for NdjsonTableReader {
    async fn load(&self, path: &Path) -> Result<OpenedTable> {
        let compression = Compression::from_path(path);
        let table_path = match self.artifact_path(path) {
            Some(artifact) => {
                self.decompress(path, &artifact).await?;
                artifact
            }
            None => path.to_path_buf(),
        };

        let (record_count, first) = self.scan(&table_path).await?;
        let fields = first.as_ref().map(infer_fields).unwrap_or_default();

        info!(
            path = %path.display(),
            compression = ?compression,
            records = record_count,
            fields = fields.len(),
            "Opened NDJSON table"
        );

        Ok(OpenedTable {
            record_count,
            fields,
            records: Box::pin(records(table_path)),
        })
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let Some(artifact) = self.artifact_path(path) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&artifact).await {
            Ok(()) => {
                debug!(artifact = %artifact.display(), "Removed decompressed table");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReaderError::Cleanup(format!(
                "Failed to remove '{}': {e}",
                artifact.display()
            ))
            .into()),
        }
    }
}

/// Lazily stream the records of a table, in file order.
fn records(path: PathBuf) -> impl Stream<Item = Result<Record>> + Send {
    try_stream! {
        let mut lines = BufReader::new(open(&path).await?).lines();
        let mut line_number = 0u64;

        while let Some(line) = lines.next_line().await.map_err(|e| read_error(&path, e))? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            yield parse_record(&line, &path, line_number)?;
        }
    }
}

async fn open(path: &Path) -> Result<File> {
    File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReaderError::NotFound(path.display().to_string()).into()
        } else {
            read_error(path, e)
        }
    })
}

fn read_error(path: &Path, e: std::io::Error) -> DxError {
    ReaderError::Io(format!("Failed to read '{}': {e}", path.display())).into()
}

fn parse_record(line: &str, path: &Path, line_number: u64) -> Result<Record> {
    match serde_json::from_str(line) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(ReaderError::InvalidFormat(format!(
            "{}:{line_number}: expected a JSON object",
            path.display()
        ))
        .into()),
        Err(e) => Err(ReaderError::InvalidFormat(format!(
            "{}:{line_number}: {e}",
            path.display()
        ))
        .into()),
    }
}

/// Field schema from the first record, in field order.
fn infer_fields(record: &Record) -> Vec<FieldDescriptor> {
    record
        .iter()
        .map(|(name, value)| {
            let kind = match value {
                Value::Null => "null",
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) => "array",
                Value::Object(_) => "object",
            };
            FieldDescriptor::new(name, kind)
        })
        .collect()
}

fn partial_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
