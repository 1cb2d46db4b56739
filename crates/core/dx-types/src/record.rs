//! Records and field schema.

use serde::{Deserialize, Serialize};

/// One row of a dataset file, keyed by field name in storage order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Description of one column of a tabular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name
    pub name: String,

    /// Column type code as reported by the file reader
    #[serde(rename = "type")]
    pub kind: String,

    /// Declared column width, when the format has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Declared decimal places, when the format has them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_count: Option<u32>,
}

impl FieldDescriptor {
    /// Creates a descriptor with a name and type code.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            size: None,
            decimal_count: None,
        }
    }

    /// Sets the declared width.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}
