//! Newline-delimited JSON wire format between a runner and its worker.
//!
//! Each line is one [`ControlMessage`]. Control events carry a `type` tag;
//! an untagged JSON object is a matching record.

use dx_error::{DxError, ProtocolError, Result};
use dx_types::{ControlMessage, FieldDescriptor, Progress, Record, WorkerEvent};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Decode one line of worker output.
pub fn decode_line(line: &str) -> Result<ControlMessage> {
    serde_json::from_str(line.trim_end()).map_err(|e| DxError::Protocol(ProtocolError::from(e)))
}

/// Writes protocol messages, one line each, flushing after every message.
#[derive(Debug)]
pub struct ProtocolWriter<W> {
    writer: W,
    buffer: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> ProtocolWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Announce the field schema.
    pub async fn send_metadata(&mut self, fields: Vec<FieldDescriptor>) -> Result<()> {
        self.send(&WorkerEvent::Metadata { fields }).await
    }

    pub async fn send_progress(&mut self, progress: Progress) -> Result<()> {
        self.send(&WorkerEvent::Progress(progress)).await
    }

    /// Send a matching record, untagged.
    pub async fn send_record(&mut self, record: &Record) -> Result<()> {
        self.send(record).await
    }

    async fn send<T: serde::Serialize + ?Sized>(&mut self, message: &T) -> Result<()> {
        self.buffer.clear();
        serde_json::to_writer(&mut self.buffer, message)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        self.buffer.push(b'\n');

        self.writer
            .write_all(&self.buffer)
            .await
            .map_err(|e| ProtocolError::Send(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ProtocolError::Send(e.to_string()))?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Tracks processed records and reports each new integer percentage once.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    processed: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: 0,
            last_percent: None,
        }
    }

    /// The 0% report sent before the first record, if the file is not empty.
    pub fn start(&mut self) -> Option<u8> {
        if self.total == 0 || self.last_percent.is_some() {
            return None;
        }
        self.last_percent = Some(0);
        Some(0)
    }

    /// Count one record. Returns the new percentage when it changed.
    pub fn advance(&mut self) -> Option<u8> {
        self.processed += 1;
        if self.total == 0 {
            return None;
        }

        let percent = (self.processed.saturating_mul(100) / self.total).min(100) as u8;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_writer_emits_one_line_per_message() {
        let mut writer = ProtocolWriter::new(Vec::new());

        writer
            .send_metadata(vec![FieldDescriptor::new("UF", "C").with_size(2)])
            .await
            .unwrap();
        writer
            .send_progress(Progress {
                percent: 50,
                processed: 1,
                total: 2,
                file: "BIRJ2204.ndjson".to_string(),
                pid: 7,
            })
            .await
            .unwrap();
        let record = json!({"UF": "RJ", "N": 1}).as_object().cloned().unwrap();
        writer.send_record(&record).await.unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(output.ends_with('\n'));

        let metadata: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(metadata["type"], "metadata");
        assert_eq!(metadata["fields"][0]["name"], "UF");

        let progress: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(progress["type"], "progress");
        assert_eq!(progress["percent"], 50);

        assert_eq!(lines[2], r#"{"UF":"RJ","N":1}"#);
    }

    #[test]
    fn test_decode_line_variants() {
        let metadata = decode_line(r#"{"type":"metadata","fields":[{"name":"UF","type":"C"}]}"#);
        assert!(matches!(
            metadata,
            Ok(ControlMessage::Event(WorkerEvent::Metadata { ref fields })) if fields.len() == 1
        ));

        let progress = decode_line(
            r#"{"type":"progress","percent":100,"processed":2,"total":2,"file":"f","pid":1}"#,
        );
        assert!(matches!(
            progress,
            Ok(ControlMessage::Event(WorkerEvent::Progress(ref p))) if p.percent == 100
        ));

        let record = decode_line("{\"UF\":\"RJ\"}\r\n").unwrap();
        match record {
            ControlMessage::Record(r) => assert_eq!(r["UF"], "RJ"),
            other => panic!("Expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_line_rejects_non_objects() {
        assert!(matches!(
            decode_line("not json"),
            Err(DxError::Protocol(ProtocolError::Decode(_)))
        ));
        assert!(decode_line("42").is_err());
    }

    #[test]
    fn test_tracker_reports_each_percent_once() {
        let mut tracker = ProgressTracker::new(4);
        assert_eq!(tracker.start(), Some(0));
        assert_eq!(tracker.start(), None);

        let reported: Vec<Option<u8>> = (0..4).map(|_| tracker.advance()).collect();
        assert_eq!(reported, vec![Some(25), Some(50), Some(75), Some(100)]);
        assert_eq!(tracker.processed(), 4);
    }

    #[test]
    fn test_tracker_skips_repeated_percent() {
        let mut tracker = ProgressTracker::new(300);
        tracker.start();

        let reported: Vec<u8> = (0..300).filter_map(|_| tracker.advance()).collect();
        assert_eq!(reported.len(), 100);
        assert_eq!(reported.first(), Some(&1));
        assert_eq!(reported.last(), Some(&100));
    }

    #[test]
    fn test_tracker_clamps_overrun() {
        let mut tracker = ProgressTracker::new(1);
        assert_eq!(tracker.advance(), Some(100));
        assert_eq!(tracker.advance(), None);
    }

    #[test]
    fn test_tracker_empty_file() {
        let mut tracker = ProgressTracker::new(0);
        assert_eq!(tracker.start(), None);
        assert_eq!(tracker.advance(), None);
    }
}
