/// One ingestion run: fetch → transform → load.
///
/// Fetch and transform failures abort before the store is touched, so the
/// previous table survives them. A successful transform that yields zero
/// rows still replaces the table, leaving it empty.

use crate::config::Config;
use crate::ingest::openaq::MeasurementSource;
use crate::ingest::transform::{self, DropCounts};
use crate::model::PipelineError;
use crate::store;
use chrono::NaiveDate;

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub date: NaiveDate,
    /// Raw records received from the source.
    pub fetched: usize,
    /// Rows that survived the transform step.
    pub kept: usize,
    pub dropped: DropCounts,
    /// Rows now in the persisted table.
    pub loaded: usize,
}

pub fn run(
    source: &dyn MeasurementSource,
    config: &Config,
    date: NaiveDate,
) -> Result<IngestReport, PipelineError> {
    let raw = source.fetch(date)?;
    let fetched = raw.len();

    let outcome = transform::transform(raw, &config.transform)?;
    let kept = outcome.rows.len();
    log::info!(
        target: crate::logging::TRANSFORM,
        "{} of {} records kept after filtering",
        kept,
        fetched
    );

    let loaded = store::replace_all(&config.store.path, &outcome.rows)?;

    Ok(IngestReport { date, fetched, kept, dropped: outcome.dropped, loaded })
}
