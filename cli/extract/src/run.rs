//! Main execution logic for dx-extract.

use anyhow::{anyhow, bail, Context, Result};
use dx_criteria::{CriteriaSet, Criterion};
use dx_jobs::{JobConfig, JobOrchestrator, JsonlSink, RunReport, SinkStats, StatsSink, WorkerEntry};
use dx_traits::{FieldParser, RecordParser, Transport};
use dx_transport_local::LocalTransport;
use dx_types::{Period, Subset};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::args::{Cli, OutputType};

/// What the run produced, for the final recap.
pub struct Recap {
    pub report: RunReport,
    pub stats: Option<SinkStats>,
}

/// Execute the extraction with the provided arguments.
pub async fn execute(args: Cli) -> Result<Recap> {
    let subset = build_subset(&args)?;
    let criteria = build_criteria(&args.criteria)?;
    let parser = build_parser(&args.transforms)?;

    let config = JobConfig::new()
        .with_data_dir(&args.data_dir)
        .with_max_concurrency(args.max_concurrency)
        .with_worker_timeout(Duration::from_secs(args.worker_timeout));
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    info!(criteria = %criteria, source = %subset.source, "Starting extraction");

    let transport = LocalTransport::connect(&args.mirror)
        .await
        .with_context(|| format!("Cannot open mirror {}", args.mirror.display()))?;
    let mut orchestrator = JobOrchestrator::new(transport, config).with_criteria(&criteria);

    let files = orchestrator.subset(subset, parser).await?;
    if files.is_empty() {
        warn!("No files match the subset");
    }

    let entry = args.worker.as_ref().map(WorkerEntry::new);

    let recap = match args.output {
        OutputType::Jsonl => {
            let sink = Arc::new(JsonlSink::stdout().with_metadata(args.metadata));
            let report = orchestrator.exec(sink.clone(), entry).await;
            sink.flush().await?;
            Recap {
                report: report?,
                stats: None,
            }
        }
        OutputType::Stats => {
            let sink = Arc::new(StatsSink::new());
            let report = orchestrator.exec(sink.clone(), entry).await?;
            Recap {
                report,
                stats: Some(sink.stats()),
            }
        }
    };

    orchestrator.transport().close().await?;

    Ok(recap)
}

fn build_subset(args: &Cli) -> Result<Subset> {
    let mut subset = Subset::new(&args.source).with_regions(&args.regions);

    match (args.start, args.end) {
        (Some(start), end) => {
            if args.regions.is_empty() {
                warn!("--start/--end are ignored without --region");
            }
            subset = subset.with_period(Period::new(start, end.unwrap_or(start)));
        }
        (None, Some(_)) => bail!("--end requires --start"),
        (None, None) => {}
    }

    // Fail on a bad period before touching the mirror
    subset.prefixes()?;
    Ok(subset)
}

fn build_criteria(raw: &[String]) -> Result<CriteriaSet> {
    let criteria = raw
        .iter()
        .map(|s| s.parse::<Criterion>())
        .collect::<dx_error::Result<Vec<_>>>()?;
    Ok(CriteriaSet::merge(criteria))
}

fn build_parser(raw: &[String]) -> Result<Option<Arc<dyn RecordParser>>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut parser = FieldParser::new();
    for transform in raw {
        let (field, name) = transform
            .split_once('=')
            .ok_or_else(|| anyhow!("Transform '{transform}' must look like FIELD=NAME"))?;
        parser = parser.with_builtin(field.trim(), name.trim())?;
    }
    Ok(Some(Arc::new(parser)))
}
