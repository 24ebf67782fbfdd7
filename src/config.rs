use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::table::CategoryFamily;

pub const DEFAULT_INPUT: &str = "ArticleLevelData.csv";
pub const DEFAULT_SA_OUTPUT: &str = "sa_data.json";
pub const DEFAULT_CIP_OUTPUT: &str = "cip_data.json";

pub const DEFAULT_SCORE_COLUMN: &str = "Zp";
pub const DEFAULT_YEAR_COLUMN: &str = "Yp";
pub const DEFAULT_SA_COLUMN: &str = "NSAp";
pub const DEFAULT_CIP_COLUMN: &str = "NCIPp";

/// Counts above this collapse into the top bucket ("4 or more").
pub const DEFAULT_CATEGORY_CAP: i64 = 4;

/// Largest accepted cap; every output record carries one field per value.
pub const MAX_CATEGORY_CAP: i64 = 64;

/// Scores at or above the threshold are high impact. Zero is high impact.
pub const IMPACT_THRESHOLD: f64 = 0.0;

/// 0 = low citation impact, 1 = high citation impact
pub const IMPACT_GROUPS: [u8; 2] = [0, 1];

/// Names of the source columns the transform reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub score: String,
    pub year: String,
    pub sa_count: String,
    pub cip_count: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            score: DEFAULT_SCORE_COLUMN.to_string(),
            year: DEFAULT_YEAR_COLUMN.to_string(),
            sa_count: DEFAULT_SA_COLUMN.to_string(),
            cip_count: DEFAULT_CIP_COLUMN.to_string(),
        }
    }
}

impl ColumnNames {
    pub fn required(&self) -> [&str; 4] {
        [
            self.score.as_str(),
            self.year.as_str(),
            self.sa_count.as_str(),
            self.cip_count.as_str(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub sa_output: PathBuf,
    pub cip_output: PathBuf,
    pub columns: ColumnNames,
    /// Overrides the delimiter inferred from the input extension.
    pub delimiter: Option<u8>,
    pub category_cap: i64,
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            sa_output: PathBuf::from(DEFAULT_SA_OUTPUT),
            cip_output: PathBuf::from(DEFAULT_CIP_OUTPUT),
            columns: ColumnNames::default(),
            delimiter: None,
            category_cap: DEFAULT_CATEGORY_CAP,
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    pub fn output_for(&self, family: CategoryFamily) -> &Path {
        match family {
            CategoryFamily::Sa => &self.sa_output,
            CategoryFamily::Cip => &self.cip_output,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CATEGORY_CAP).contains(&self.category_cap) {
            return Err(ConfigError::CategoryCap {
                cap: self.category_cap,
                max: MAX_CATEGORY_CAP,
            });
        }
        Ok(())
    }

    /// Category values that get a slot in every output record.
    pub fn category_values(&self) -> RangeInclusive<i64> {
        1..=self.category_cap
    }
}
