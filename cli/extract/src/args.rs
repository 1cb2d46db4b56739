//! CLI argument definitions for dx-extract.

use clap::{Parser, ValueEnum};
pub use dx_cli_common::LogLevel;
use dx_types::YearMonth;
use std::path::PathBuf;

/// Dataset subset extraction.
///
/// Lists the files of a source in a local mirror, copies them into the data
/// directory and runs one `dx-worker` per file, writing matching records to
/// stdout as JSON lines.
///
/// ## Examples
///
/// Every record of one region:
///   dx-extract --mirror /srv/mirror --source BI --region RJ
///
/// Two occupations in two regions over a quarter:
///   dx-extract --mirror /srv/mirror --source BI -r RJ -r SP \
///       --start 2022-01 --end 2022-03 -c "CBO=223293,225125"
///
/// Decode an identifier and only count matches:
///   dx-extract --mirror /srv/mirror --source BI -r RJ \
///       --transform CNS_PAC=hex --output stats
#[derive(Parser, Debug)]
#[command(name = "dx-extract")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Source ===
    /// Mirror directory holding the dataset files
    #[arg(short, long, env = "DX_MIRROR")]
    pub mirror: PathBuf,

    /// Source code (file-name prefix, e.g. "BI")
    #[arg(short, long)]
    pub source: String,

    /// Region code (can be specified multiple times)
    #[arg(short, long = "region")]
    pub regions: Vec<String>,

    /// First month, as YYYY-MM (requires at least one region)
    #[arg(long, value_parser = parse_year_month)]
    pub start: Option<YearMonth>,

    /// Last month, as YYYY-MM (defaults to --start)
    #[arg(long, value_parser = parse_year_month)]
    pub end: Option<YearMonth>,

    // === Filtering ===
    /// Criterion, as FIELD=VALUE or FIELD=V1,V2 (can be specified multiple times)
    ///
    /// Criteria on the same field are merged (OR); different fields combine with AND.
    #[arg(short, long = "criterion")]
    pub criteria: Vec<String>,

    /// Field transform applied to forwarded records, as FIELD=NAME
    ///
    /// Built-in transforms: hex, trim, upper, number.
    #[arg(short, long = "transform")]
    pub transforms: Vec<String>,

    // === Execution ===
    /// Directory the files are downloaded into
    #[arg(short, long, env = "DX_DATA_DIR", default_value = "./")]
    pub data_dir: PathBuf,

    /// Files dispatched per chunk (must be >= 1)
    #[arg(long, default_value = "5", value_parser = parse_positive_usize)]
    pub max_concurrency: usize,

    /// Seconds a worker may run before it is killed (must be >= 1)
    #[arg(long, default_value = "3600", value_parser = parse_positive_u64)]
    pub worker_timeout: u64,

    /// Worker binary (defaults to dx-worker next to this executable)
    #[arg(long, env = "DX_WORKER")]
    pub worker: Option<PathBuf>,

    // === Output ===
    /// What to do with matching records
    #[arg(short, long, value_enum, default_value = "jsonl")]
    pub output: OutputType,

    /// Also write each file's schema as a metadata line (jsonl output)
    #[arg(long)]
    pub metadata: bool,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, env = "DX_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Output type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// JSON lines on stdout
    Jsonl,
    /// Count records and files only
    Stats,
}

/// Parse a month as YYYY-MM.
fn parse_year_month(s: &str) -> Result<YearMonth, String> {
    let (year, month) = s
        .split_once('-')
        .ok_or_else(|| format!("'{}' is not a YYYY-MM month", s))?;
    let year: i32 = year
        .parse()
        .map_err(|_| format!("'{}' is not a valid year", year))?;
    let month: u32 = month
        .parse()
        .map_err(|_| format!("'{}' is not a valid month", month))?;
    if !(1..=12).contains(&month) {
        return Err(format!("{} is not in 1..=12", month));
    }
    Ok(YearMonth::new(year, month))
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

/// Parse a positive u64 (>= 1).
fn parse_positive_u64(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_month() {
        assert_eq!(parse_year_month("2022-04").unwrap(), YearMonth::new(2022, 4));
        assert!(parse_year_month("2022-13").is_err());
        assert!(parse_year_month("202204").is_err());
        assert!(parse_year_month("twenty-04").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_options() {
        let cli = Cli::try_parse_from([
            "dx-extract",
            "--mirror",
            "/srv/mirror",
            "--source",
            "BI",
            "-r",
            "RJ",
            "-r",
            "SP",
            "--start",
            "2022-01",
            "-c",
            "CBO=223293,225125",
            "-c",
            "UF=RJ",
            "--output",
            "stats",
        ])
        .unwrap();

        assert_eq!(cli.regions, vec!["RJ", "SP"]);
        assert_eq!(cli.criteria.len(), 2);
        assert_eq!(cli.start, Some(YearMonth::new(2022, 1)));
        assert_eq!(cli.end, None);
        assert_eq!(cli.output, OutputType::Stats);
        assert_eq!(cli.max_concurrency, 5);
    }

    #[test]
    fn test_cli_rejects_zero_concurrency() {
        let result = Cli::try_parse_from([
            "dx-extract",
            "--mirror",
            "/srv/mirror",
            "--source",
            "BI",
            "--max-concurrency",
            "0",
        ]);
        assert!(result.is_err());
    }
}
