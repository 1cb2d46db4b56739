//! Serializable form of filter criteria.

use serde::{Deserialize, Serialize};

/// Serializable form of one criterion, as carried inside a [`crate::JobMessage`].
///
/// Encoded as `{"kind": "string"|"array", "field": ..., "value": ...}`.
/// The order of values in an `Array` spec carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CriterionSpec {
    /// Exact match on a single value
    String { field: String, value: String },

    /// Membership match on a value set
    Array { field: String, value: Vec<String> },
}

impl CriterionSpec {
    /// Field the criterion applies to.
    pub fn field(&self) -> &str {
        match self {
            Self::String { field, .. } | Self::Array { field, .. } => field,
        }
    }
}
