//! Parent-side record transformation.

use dx_error::{DxError, Result};
use dx_types::Record;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A function applied to one field value.
pub type FieldTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Transforms records after they cross the process boundary.
pub trait RecordParser: Send + Sync {
    fn parse(&self, record: Record) -> Record;
}

/// A field name → transform dictionary.
///
/// Fields absent from a record are left alone; fields without a transform
/// pass through unchanged.
#[derive(Clone, Default)]
pub struct FieldParser {
    dictionary: HashMap<String, FieldTransform>,
}

impl FieldParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for a field (builder pattern).
    pub fn with_transform<F>(mut self, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.dictionary.insert(field.into(), Arc::new(transform));
        self
    }

    /// Register a built-in transform by name (`hex`, `trim`, `upper`, `number`).
    pub fn with_builtin(mut self, field: impl Into<String>, name: &str) -> Result<Self> {
        let transform = builtin(name)
            .ok_or_else(|| DxError::Config(format!("Unknown field transform '{name}'")))?;
        self.dictionary.insert(field.into(), transform);
        Ok(self)
    }

    /// Fields that have a transform.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.dictionary.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }
}

impl RecordParser for FieldParser {
    fn parse(&self, mut record: Record) -> Record {
        for (field, transform) in &self.dictionary {
            if let Some(value) = record.get_mut(field) {
                let original = std::mem::take(value);
                *value = transform(original);
            }
        }
        record
    }
}

impl fmt::Debug for FieldParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.fields().collect();
        fields.sort_unstable();
        f.debug_struct("FieldParser").field("fields", &fields).finish()
    }
}

/// Look up a built-in transform by name.
pub fn builtin(name: &str) -> Option<FieldTransform> {
    let transform: FieldTransform = match name {
        "hex" => Arc::new(|value| map_str(value, |s| hex::encode(s.as_bytes()))),
        "trim" => Arc::new(|value| map_str(value, |s| s.trim().to_string())),
        "upper" => Arc::new(|value| map_str(value, |s| s.to_uppercase())),
        "number" => Arc::new(|value| match value {
            Value::String(s) => parse_number(&s).unwrap_or(Value::String(s)),
            other => other,
        }),
        _ => return None,
    };
    Some(transform)
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_field_parser_applies_only_registered_fields() {
        let parser = FieldParser::new().with_transform("NAME", |v| match v {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        });

        let parsed = parser.parse(record(json!({"NAME": "ANA", "UF": "RJ"})));

        assert_eq!(parsed["NAME"], "ana");
        assert_eq!(parsed["UF"], "RJ");
    }

    #[test]
    fn test_missing_field_is_not_inserted() {
        let parser = FieldParser::new().with_builtin("CNS_PAC", "hex").unwrap();
        let parsed = parser.parse(record(json!({"UF": "RJ"})));

        assert!(!parsed.contains_key("CNS_PAC"));
    }

    #[test]
    fn test_builtin_transforms() {
        let parser = FieldParser::new()
            .with_builtin("CNS_PAC", "hex")
            .unwrap()
            .with_builtin("NOME", "trim")
            .unwrap()
            .with_builtin("UF", "upper")
            .unwrap()
            .with_builtin("QT", "number")
            .unwrap()
            .with_builtin("VL", "number")
            .unwrap();

        let parsed = parser.parse(record(json!({
            "CNS_PAC": "AB",
            "NOME": "  MARIA ",
            "UF": "rj",
            "QT": "12",
            "VL": "not a number"
        })));

        assert_eq!(parsed["CNS_PAC"], "4142");
        assert_eq!(parsed["NOME"], "MARIA");
        assert_eq!(parsed["UF"], "RJ");
        assert_eq!(parsed["QT"], 12);
        assert_eq!(parsed["VL"], "not a number");
    }

    #[test]
    fn test_unknown_builtin_is_config_error() {
        let result = FieldParser::new().with_builtin("X", "rot13");
        assert!(matches!(result, Err(DxError::Config(_))));
    }

    #[test]
    fn test_parse_keeps_field_order() {
        let parser = FieldParser::new().with_builtin("B", "upper").unwrap();
        let parsed = parser.parse(record(json!({"A": "x", "B": "y", "C": "z"})));

        let keys: Vec<&String> = parsed.keys().collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }
}
