//! Record filter predicates.
//!
//! A [`Criterion`] tests one field of a record: either for an exact value or
//! for membership in a value set. A [`CriteriaSet`] combines criteria with
//! AND logic across fields. Building a set merges all criteria that share a
//! field into one, so several values for the same field combine with OR
//! logic and duplicates disappear.
//!
//! # Example
//!
//! ```
//! use dx_criteria::{CriteriaSet, Criterion};
//! use serde_json::json;
//!
//! let set = CriteriaSet::merge([
//!     Criterion::exact("CBO", "223293"),
//!     Criterion::exact("CBO", "225125"),
//!     Criterion::exact("OTHER", "SOME_VALUE"),
//! ]);
//!
//! let record = json!({"CBO": "225125", "OTHER": "SOME_VALUE"});
//! assert!(set.check(record.as_object().unwrap()));
//! assert_eq!(set.len(), 2);
//! ```

mod criterion;
mod set;

pub use criterion::Criterion;
pub use set::CriteriaSet;
