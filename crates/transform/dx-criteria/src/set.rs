//! AND-combination of per-field criteria.

use crate::criterion::Criterion;
use dx_types::{CriterionSpec, Record};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Criteria combined with AND logic, holding at most one criterion per
/// named field.
///
/// Only [`CriteriaSet::merge`] builds a set, which is what keeps the
/// one-per-field invariant. Criteria with an empty field name are kept
/// as they are, after the merged ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    /// An empty set, which every record satisfies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge criteria into a set.
    ///
    /// Criteria are grouped by field in order of first appearance. Each group
    /// collapses to one [`Criterion::Exact`] when its deduplicated values have
    /// a single member, or to one [`Criterion::AnyOf`] holding all members.
    pub fn merge<I>(criteria: I) -> Self
    where
        I: IntoIterator<Item = Criterion>,
    {
        let mut groups: IndexMap<String, HashSet<String>> = IndexMap::new();
        let mut passthrough = Vec::new();

        for criterion in criteria {
            if criterion.field().is_empty() {
                passthrough.push(criterion);
                continue;
            }
            let values = groups.entry(criterion.field().to_string()).or_default();
            values.extend(criterion.accepted().map(str::to_string));
        }

        let mut merged: Vec<Criterion> = groups
            .into_iter()
            .map(|(field, values)| {
                if values.len() == 1 {
                    let value = values.into_iter().next().unwrap_or_default();
                    Criterion::Exact { field, value }
                } else {
                    Criterion::AnyOf { field, values }
                }
            })
            .collect();
        merged.extend(passthrough);

        Self { criteria: merged }
    }

    /// Rebuild a set from serialized criteria; `None` yields an empty set.
    pub fn from_specs(specs: Option<&[CriterionSpec]>) -> Self {
        match specs {
            Some(specs) => Self::merge(specs.iter().map(Criterion::from_spec)),
            None => Self::empty(),
        }
    }

    /// Serializable form, one spec per criterion.
    pub fn to_specs(&self) -> Vec<CriterionSpec> {
        self.criteria.iter().map(Criterion::to_spec).collect()
    }

    /// True when every criterion matches. Stops at the first failure.
    pub fn check(&self, record: &Record) -> bool {
        self.criteria.iter().all(|c| c.matches(record))
    }

    /// The merged criteria.
    pub fn values(&self) -> &[Criterion] {
        &self.criteria
    }

    /// The criterion for a field, if any.
    pub fn get(&self, field: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.field() == field)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl FromIterator<Criterion> for CriteriaSet {
    fn from_iter<T: IntoIterator<Item = Criterion>>(iter: T) -> Self {
        Self::merge(iter)
    }
}

impl fmt::Display for CriteriaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.criteria.is_empty() {
            return write!(f, "(all records)");
        }
        let parts: Vec<String> = self.criteria.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record(json!({"CBO": "223293", "OTHER": "SOME_VALUE"})),
            record(json!({"CBO": "225125", "OTHER": "SOME_VALUE"})),
            record(json!({"CBO": "999999", "OTHER": "SOME_VALUE"})),
            record(json!({"CBO": "223293", "OTHER": "WRONG"})),
            record(json!({"CBO": "223293"})),
            record(json!({"UF": "RJ"})),
            record(json!({})),
        ]
    }

    fn or_and_example() -> CriteriaSet {
        CriteriaSet::merge([
            Criterion::exact("CBO", "223293"),
            Criterion::exact("CBO", "225125"),
            Criterion::exact("OTHER", "SOME_VALUE"),
        ])
    }

    #[test]
    fn test_or_within_field_and_across_fields() {
        let set = or_and_example();

        assert!(set.check(&record(json!({"CBO": "223293", "OTHER": "SOME_VALUE"}))));
        assert!(set.check(&record(json!({"CBO": "225125", "OTHER": "SOME_VALUE"}))));
        assert!(!set.check(&record(json!({"CBO": "999999", "OTHER": "SOME_VALUE"}))));
        assert!(!set.check(&record(json!({"CBO": "223293", "OTHER": "WRONG"}))));
    }

    #[test]
    fn test_merge_shapes() {
        let set = or_and_example();

        assert_eq!(set.len(), 2);
        match set.get("CBO") {
            Some(Criterion::AnyOf { values, .. }) => {
                let expected: HashSet<String> =
                    ["223293", "225125"].iter().map(|s| s.to_string()).collect();
                assert_eq!(values, &expected);
            }
            other => panic!("Expected AnyOf for CBO, got {other:?}"),
        }
        assert_eq!(
            set.get("OTHER"),
            Some(&Criterion::exact("OTHER", "SOME_VALUE"))
        );
    }

    #[test]
    fn test_duplicate_values_collapse_to_exact() {
        let set = CriteriaSet::merge([
            Criterion::exact("UF", "RJ"),
            Criterion::any_of("UF", ["RJ"]),
            Criterion::exact("UF", "RJ"),
        ]);

        assert_eq!(set.values(), &[Criterion::exact("UF", "RJ")]);
    }

    #[test]
    fn test_array_and_scalar_merge() {
        let set = CriteriaSet::merge([
            Criterion::any_of("UF", ["RJ", "SP"]),
            Criterion::exact("UF", "MG"),
        ]);

        assert_eq!(set, CriteriaSet::merge([Criterion::any_of("UF", ["MG", "SP", "RJ"])]));
        assert!(set.check(&record(json!({"UF": "MG"}))));
    }

    #[test]
    fn test_field_order_follows_first_appearance() {
        let set = CriteriaSet::merge([
            Criterion::exact("B", "1"),
            Criterion::exact("A", "1"),
            Criterion::exact("B", "2"),
        ]);

        let fields: Vec<&str> = set.values().iter().map(Criterion::field).collect();
        assert_eq!(fields, vec!["B", "A"]);
    }

    #[test]
    fn test_unnamed_criteria_pass_through() {
        let set = CriteriaSet::merge([
            Criterion::exact("", "x"),
            Criterion::exact("UF", "RJ"),
            Criterion::exact("", "y"),
        ]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.values()[0], Criterion::exact("UF", "RJ"));
        assert_eq!(set.values()[1], Criterion::exact("", "x"));
        assert_eq!(set.values()[2], Criterion::exact("", "y"));
    }

    #[test]
    fn test_empty_set_accepts_everything() {
        let set = CriteriaSet::empty();
        for r in sample_records() {
            assert!(set.check(&r));
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let inputs = vec![
            vec![
                Criterion::exact("CBO", "223293"),
                Criterion::exact("CBO", "225125"),
                Criterion::exact("OTHER", "SOME_VALUE"),
            ],
            vec![Criterion::any_of("UF", ["RJ", "SP"]), Criterion::exact("UF", "RJ")],
            vec![Criterion::exact("", "x"), Criterion::exact("A", "1")],
            vec![],
        ];

        for input in inputs {
            let once = CriteriaSet::merge(input);
            let twice = CriteriaSet::merge(once.values().to_vec());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_spec_round_trip_preserves_check() {
        let sets = vec![
            or_and_example(),
            CriteriaSet::merge([Criterion::any_of("UF", ["RJ", "SP"])]),
            CriteriaSet::empty(),
        ];

        for set in sets {
            let specs = set.to_specs();
            let json = serde_json::to_string(&specs).unwrap();
            let decoded: Vec<CriterionSpec> = serde_json::from_str(&json).unwrap();
            let restored = CriteriaSet::from_specs(Some(&decoded));

            for r in sample_records() {
                assert_eq!(restored.check(&r), set.check(&r), "record {r:?}");
            }
        }
    }

    #[test]
    fn test_absent_specs_yield_empty_set() {
        assert!(CriteriaSet::from_specs(None).is_empty());
    }

    #[test]
    fn test_from_specs_restores_invariant() {
        let specs = vec![
            CriterionSpec::String {
                field: "UF".to_string(),
                value: "RJ".to_string(),
            },
            CriterionSpec::String {
                field: "UF".to_string(),
                value: "SP".to_string(),
            },
        ];

        let set = CriteriaSet::from_specs(Some(&specs));
        assert_eq!(set.len(), 1);
        assert!(set.check(&record(json!({"UF": "SP"}))));
    }

    #[test]
    fn test_display() {
        let set = CriteriaSet::merge([
            Criterion::exact("CBO", "2"),
            Criterion::exact("CBO", "1"),
            Criterion::exact("UF", "RJ"),
        ]);
        assert_eq!(set.to_string(), "CBO in [1, 2] AND UF = RJ");
        assert_eq!(CriteriaSet::empty().to_string(), "(all records)");
    }
}
