//! Single-field criteria.

use dx_error::DxError;
use dx_types::{CriterionSpec, Record};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A predicate on one field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Matches when the field equals `value`
    Exact { field: String, value: String },

    /// Matches when the field is one of `values`
    AnyOf {
        field: String,
        values: HashSet<String>,
    },
}

impl Criterion {
    /// Exact-match criterion.
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Exact {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Membership criterion.
    pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Field the criterion tests.
    pub fn field(&self) -> &str {
        match self {
            Self::Exact { field, .. } | Self::AnyOf { field, .. } => field,
        }
    }

    /// Identifier used in logs, `<FIELD>_FILTER`.
    pub fn name(&self) -> String {
        format!("{}_FILTER", self.field())
    }

    /// Values accepted by the criterion. Order is unspecified for `AnyOf`.
    pub fn accepted(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Exact { value, .. } => Box::new(std::iter::once(value.as_str())),
            Self::AnyOf { values, .. } => Box::new(values.iter().map(String::as_str)),
        }
    }

    /// Check whether a record satisfies the criterion.
    ///
    /// Only string field values can match; a missing field never matches.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(Value::String(actual)) = record.get(self.field()) else {
            return false;
        };
        match self {
            Self::Exact { value, .. } => actual == value,
            Self::AnyOf { values, .. } => values.contains(actual),
        }
    }

    /// Serializable form.
    pub fn to_spec(&self) -> CriterionSpec {
        match self {
            Self::Exact { field, value } => CriterionSpec::String {
                field: field.clone(),
                value: value.clone(),
            },
            Self::AnyOf { field, values } => CriterionSpec::Array {
                field: field.clone(),
                value: values.iter().cloned().collect(),
            },
        }
    }

    /// Rebuild a criterion from its serializable form.
    pub fn from_spec(spec: &CriterionSpec) -> Self {
        match spec {
            CriterionSpec::String { field, value } => Self::exact(field, value),
            CriterionSpec::Array { field, value } => Self::any_of(field, value.iter().cloned()),
        }
    }
}

impl From<&CriterionSpec> for Criterion {
    fn from(spec: &CriterionSpec) -> Self {
        Self::from_spec(spec)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { field, value } => write!(f, "{field} = {value}"),
            Self::AnyOf { field, values } => {
                let mut sorted: Vec<&String> = values.iter().collect();
                sorted.sort();
                let joined: Vec<&str> = sorted.into_iter().map(String::as_str).collect();
                write!(f, "{field} in [{}]", joined.join(", "))
            }
        }
    }
}

/// Parses `FIELD=VALUE` or `FIELD=V1,V2,...`.
impl FromStr for Criterion {
    type Err = DxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, raw_values) = s
            .split_once('=')
            .ok_or_else(|| DxError::Config(format!("Criterion '{s}' must look like FIELD=VALUE")))?;

        let field = field.trim();
        if field.is_empty() {
            return Err(DxError::Config(format!("Criterion '{s}' has no field name")));
        }

        let values: Vec<&str> = raw_values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        match values.as_slice() {
            [] => Err(DxError::Config(format!("Criterion '{s}' has no values"))),
            [single] => Ok(Self::exact(field, *single)),
            many => Ok(Self::any_of(field, many.iter().copied())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_exact_matches_equal_string() {
        let criterion = Criterion::exact("CBOPROF", "223293");

        assert!(criterion.matches(&record(json!({"CBOPROF": "223293"}))));
        assert!(!criterion.matches(&record(json!({"CBOPROF": "225125"}))));
        assert!(!criterion.matches(&record(json!({"OTHER": "223293"}))));
    }

    #[test]
    fn test_non_string_values_never_match() {
        let criterion = Criterion::exact("QT", "1");
        assert!(!criterion.matches(&record(json!({"QT": 1}))));
    }

    #[test]
    fn test_any_of_membership() {
        let criterion = Criterion::any_of("UF", ["RJ", "SP"]);

        assert!(criterion.matches(&record(json!({"UF": "SP"}))));
        assert!(!criterion.matches(&record(json!({"UF": "MG"}))));
    }

    #[test]
    fn test_name() {
        assert_eq!(Criterion::exact("CBOPROF", "1").name(), "CBOPROF_FILTER");
    }

    #[test]
    fn test_spec_conversion() {
        let criterion = Criterion::any_of("UF", ["RJ", "SP"]);
        let back = Criterion::from_spec(&criterion.to_spec());
        assert_eq!(back, criterion);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "CBOPROF=223293".parse::<Criterion>().unwrap(),
            Criterion::exact("CBOPROF", "223293")
        );
        assert_eq!(
            "UF = RJ, SP".parse::<Criterion>().unwrap(),
            Criterion::any_of("UF", ["RJ", "SP"])
        );
        assert!("UF".parse::<Criterion>().is_err());
        assert!("=RJ".parse::<Criterion>().is_err());
        assert!("UF=".parse::<Criterion>().is_err());
    }

    #[test]
    fn test_display_is_sorted() {
        let criterion = Criterion::any_of("UF", ["SP", "RJ"]);
        assert_eq!(criterion.to_string(), "UF in [RJ, SP]");
    }
}
