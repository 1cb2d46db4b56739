//! Messages exchanged between the orchestrating process and a worker.

use crate::record::{FieldDescriptor, Record};
use serde::{Deserialize, Serialize};

/// Progress report for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Integer percentage of records processed
    pub percent: u8,

    /// Records processed so far
    pub processed: u64,

    /// Records in the file
    pub total: u64,

    /// File being processed
    pub file: String,

    /// Worker process id
    pub pid: u32,
}

/// Tagged control events, discriminated by a `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerEvent {
    /// Field schema, sent once before any data
    Metadata { fields: Vec<FieldDescriptor> },

    /// Progress, at most once per percentage point
    Progress(Progress),
}

/// Envelope for everything a worker writes to its parent.
///
/// Control events carry a `type` tag; anything else is a raw matching record.
/// A record that happens to be shaped exactly like a control event is decoded
/// as that event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlMessage {
    Event(WorkerEvent),
    Record(Record),
}

impl From<WorkerEvent> for ControlMessage {
    fn from(event: WorkerEvent) -> Self {
        ControlMessage::Event(event)
    }
}

impl From<Progress> for ControlMessage {
    fn from(progress: Progress) -> Self {
        ControlMessage::Event(WorkerEvent::Progress(progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_is_tagged() {
        let message = ControlMessage::from(WorkerEvent::Metadata {
            fields: vec![FieldDescriptor::new("UF", "C").with_size(2)],
        });
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "metadata");
        assert_eq!(value["fields"][0]["name"], "UF");
        assert_eq!(value["fields"][0]["type"], "C");
    }

    #[test]
    fn test_untagged_object_is_record() {
        let message: ControlMessage =
            serde_json::from_value(json!({"CBOPROF": "223293", "UF": "RJ"})).unwrap();

        match message {
            ControlMessage::Record(record) => assert_eq!(record["CBOPROF"], "223293"),
            other => panic!("Expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_progress_decodes_as_event() {
        let message: ControlMessage = serde_json::from_value(json!({
            "type": "progress",
            "percent": 50,
            "processed": 5,
            "total": 10,
            "file": "a.ndjson",
            "pid": 12
        }))
        .unwrap();

        assert!(matches!(
            message,
            ControlMessage::Event(WorkerEvent::Progress(Progress { percent: 50, .. }))
        ));
    }

    #[test]
    fn test_record_with_unknown_type_field_is_record() {
        let message: ControlMessage =
            serde_json::from_value(json!({"type": "outpatient", "UF": "RJ"})).unwrap();
        assert!(matches!(message, ControlMessage::Record(_)));
    }
}
