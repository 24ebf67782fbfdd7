//! Per-year category-span summaries of article-level metadata.
//!
//! The pipeline loads an article table, labels each article's citation
//! impact, caps its subject-area (SA) and classification (CIP) counts, and
//! writes for every (year, impact group) the share of articles spanning
//! exactly 1..=cap categories. The two JSON outputs feed the chart front end.

#[macro_use]
mod macros;

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod labeling;
pub mod loader;
pub mod output;
pub mod table;

use std::ops::RangeInclusive;

use arrow::record_batch::RecordBatch;
use tracing::info;

pub use config::PipelineConfig;
pub use errors::{ConfigError, InputError, OutputError, PipelineError, TransformError};
pub use output::SummaryRecord;
pub use table::{CategoryFamily, CellKey};

use loader::LoadOptions;

// ====== PROCESSING STATISTICS ======
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub distinct_years: usize,
    pub sa_records: usize,
    pub cip_records: usize,
}

/// Labeled-table to output records for one category family.
pub fn summarize(
    labeled: &RecordBatch,
    family: CategoryFamily,
    values: RangeInclusive<i64>,
) -> Result<Vec<SummaryRecord>, TransformError> {
    let aggregate = aggregate::aggregate(labeled, family)?;
    let dense = aggregate::densify(&aggregate, family, values)?;
    Ok(output::to_records(&dense))
}

/// Runs load, transform and write once.
pub fn run(config: &PipelineConfig) -> Result<PipelineStats, PipelineError> {
    config.validate()?;

    let table = loader::load_articles(&config.input, &LoadOptions::from(config))?;
    let labeled = labeling::label_and_cap(&table.batch, config.category_cap)?;

    let mut stats = PipelineStats {
        rows_read: table.rows_read,
        rows_skipped: table.rows_skipped,
        ..Default::default()
    };

    // Both families are summarized before anything is written
    let summaries = CategoryFamily::ALL
        .into_iter()
        .map(|family| {
            summarize(&labeled, family, config.category_values()).map(|records| (family, records))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (family, records) in &summaries {
        output::write_json(config.output_for(*family), records)?;
        match family {
            CategoryFamily::Sa => stats.sa_records = records.len(),
            CategoryFamily::Cip => stats.cip_records = records.len(),
        }
    }
    stats.distinct_years = stats.sa_records / config::IMPACT_GROUPS.len();

    info!("Final Processing Statistics:");
    info!("  Rows read: {}", stats.rows_read);
    info!("  Rows skipped: {}", stats.rows_skipped);
    info!("  Distinct years: {}", stats.distinct_years);
    info!("  SA records: {}", stats.sa_records);
    info!("  CIP records: {}", stats.cip_records);

    Ok(stats)
}
