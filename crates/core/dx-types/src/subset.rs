//! Dataset selection descriptors.

use chrono::{Datelike, Utc};
use dx_error::{Result, TransportError};
use serde::{Deserialize, Serialize};

/// Earliest year for which monthly files are published.
pub const EARLIEST_PERIOD_YEAR: i32 = 2008;

/// A year/month pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Two-digit year followed by two-digit month, e.g. `2204` for April 2022.
    pub fn code(&self) -> String {
        format!("{:02}{:02}", self.year.rem_euclid(100), self.month)
    }

    fn next(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

/// Inclusive range of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl Period {
    pub fn new(start: YearMonth, end: YearMonth) -> Self {
        Self { start, end }
    }

    /// Validates the period against the publication window ending at `current_year`.
    pub fn validate(&self, current_year: i32) -> Result<()> {
        for ym in [self.start, self.end] {
            if !(1..=12).contains(&ym.month) {
                return Err(invalid(format!("month {} is out of range", ym.month)));
            }
        }
        if self.start > self.end {
            return Err(invalid("period starts after it ends".to_string()));
        }
        if self.start.year < EARLIEST_PERIOD_YEAR || self.end.year > current_year {
            return Err(invalid(format!(
                "period must lie within {EARLIEST_PERIOD_YEAR}..={current_year}"
            )));
        }
        Ok(())
    }

    /// Month codes covered by the period, in chronological order.
    pub fn month_codes(&self) -> Vec<String> {
        let mut codes = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            codes.push(cursor.code());
            cursor = cursor.next();
        }
        codes
    }
}

/// Caller-supplied dataset selection.
///
/// Immutable once built; the orchestrator only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subset {
    /// Dataset source code (e.g. `BI`, `RD`)
    pub source: String,

    /// Region codes (e.g. `RJ`, `SP`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,

    /// Optional month range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl Subset {
    /// Create a subset covering every file of a source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            regions: Vec::new(),
            period: None,
        }
    }

    /// Restrict the subset to the given regions.
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the subset to a month range.
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    /// File-name prefixes selected by this subset, using the current year as the
    /// upper bound of the publication window.
    pub fn prefixes(&self) -> Result<Vec<String>> {
        self.prefixes_at(Utc::now().year())
    }

    /// File-name prefixes selected by this subset.
    ///
    /// With regions and a period: every month code (outer) crossed with every
    /// region (inner). With regions only: one prefix per region. Otherwise the
    /// bare source code. A period is only honored together with regions.
    pub fn prefixes_at(&self, current_year: i32) -> Result<Vec<String>> {
        if self.source.is_empty() {
            return Err(invalid("source code is empty".to_string()));
        }

        match (&self.period, self.regions.is_empty()) {
            (Some(period), false) => {
                period.validate(current_year)?;
                Ok(period
                    .month_codes()
                    .iter()
                    .flat_map(|code| {
                        self.regions
                            .iter()
                            .map(move |region| format!("{}{}{}", self.source, region, code))
                    })
                    .collect())
            }
            (None, false) => Ok(self
                .regions
                .iter()
                .map(|region| format!("{}{}", self.source, region))
                .collect()),
            (_, true) => Ok(vec![self.source.clone()]),
        }
    }
}

fn invalid(reason: String) -> dx_error::DxError {
    TransportError::InvalidSubset(reason).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_code() {
        assert_eq!(YearMonth::new(2022, 4).code(), "2204");
        assert_eq!(YearMonth::new(2009, 12).code(), "0912");
    }

    #[test]
    fn test_prefixes_source_only() {
        let subset = Subset::new("BI");
        assert_eq!(subset.prefixes_at(2025).unwrap(), vec!["BI"]);
    }

    #[test]
    fn test_prefixes_with_regions() {
        let subset = Subset::new("BI").with_regions(["RJ", "SP"]);
        assert_eq!(subset.prefixes_at(2025).unwrap(), vec!["BIRJ", "BISP"]);
    }

    #[test]
    fn test_prefixes_period_outer_region_inner() {
        let subset = Subset::new("BI")
            .with_regions(["RJ", "SP"])
            .with_period(Period::new(YearMonth::new(2022, 12), YearMonth::new(2023, 1)));

        assert_eq!(
            subset.prefixes_at(2025).unwrap(),
            vec!["BIRJ2212", "BISP2212", "BIRJ2301", "BISP2301"]
        );
    }

    #[test]
    fn test_period_without_regions_is_ignored() {
        let subset = Subset::new("RD")
            .with_period(Period::new(YearMonth::new(2022, 1), YearMonth::new(2022, 2)));
        assert_eq!(subset.prefixes_at(2025).unwrap(), vec!["RD"]);
    }

    #[test]
    fn test_invalid_periods() {
        let too_early = Subset::new("BI")
            .with_regions(["RJ"])
            .with_period(Period::new(YearMonth::new(2007, 1), YearMonth::new(2008, 1)));
        assert!(too_early.prefixes_at(2025).is_err());

        let in_future = Subset::new("BI")
            .with_regions(["RJ"])
            .with_period(Period::new(YearMonth::new(2024, 1), YearMonth::new(2026, 1)));
        assert!(in_future.prefixes_at(2025).is_err());

        let reversed = Subset::new("BI")
            .with_regions(["RJ"])
            .with_period(Period::new(YearMonth::new(2023, 5), YearMonth::new(2023, 4)));
        assert!(reversed.prefixes_at(2025).is_err());

        let bad_month = Subset::new("BI")
            .with_regions(["RJ"])
            .with_period(Period::new(YearMonth::new(2023, 0), YearMonth::new(2023, 4)));
        assert!(bad_month.prefixes_at(2025).is_err());
    }

    #[test]
    fn test_subset_deserializes_without_optional_fields() {
        let subset: Subset = serde_json::from_str(r#"{"source":"BI"}"#).unwrap();
        assert!(subset.regions.is_empty());
        assert!(subset.period.is_none());
    }
}
