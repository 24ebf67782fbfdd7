//! Per-cell counting and densification of one category family.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use arrow::array::{Int64Array, UInt8Array};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::config::{IMPACT_GROUPS, MAX_CATEGORY_CAP};
use crate::errors::TransformError;
use crate::table::{CategoryFamily, CellKey, IMPACT_GROUP, YEAR};

/// Sparse counts for one category family. Only observed combinations appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryAggregate {
    /// Every distinct year in the table, whatever its category values.
    pub years: BTreeSet<i64>,
    pub totals: BTreeMap<CellKey, u64>,
    /// Keyed by cell and exact (capped) category count.
    pub counts: BTreeMap<(CellKey, i64), u64>,
}

impl CategoryAggregate {
    pub fn total(&self, key: CellKey) -> u64 {
        self.totals.get(&key).copied().unwrap_or(0)
    }

    pub fn count(&self, key: CellKey, value: i64) -> u64 {
        self.counts.get(&(key, value)).copied().unwrap_or(0)
    }
}

/// Counts rows per (year, impact group) and per (year, impact group, value).
///
/// Rows with a missing category value still count towards their cell total.
pub fn aggregate(
    batch: &RecordBatch,
    family: CategoryFamily,
) -> Result<CategoryAggregate, TransformError> {
    let years = typed_column!(batch, YEAR, Int64Array, "Int64");
    let groups = typed_column!(batch, IMPACT_GROUP, UInt8Array, "UInt8");
    let values = typed_column!(batch, family.column(), Int64Array, "Int64");

    let mut aggregate = CategoryAggregate::default();
    let rows = years
        .values()
        .iter()
        .zip(groups.values().iter())
        .zip(values.iter());
    for ((year, group), value) in rows {
        let key = CellKey::new(*year, *group);
        aggregate.years.insert(*year);
        *aggregate.totals.entry(key).or_insert(0) += 1;
        if let Some(value) = value {
            *aggregate.counts.entry((key, value)).or_insert(0) += 1;
        }
    }

    for (key, total) in &aggregate.totals {
        debug!(
            "{} cell year={} z={}: {} articles",
            family.prefix(),
            key.year,
            key.impact_group,
            total
        );
    }

    Ok(aggregate)
}

/// Undefined (`None`) when the cell holds no articles.
pub fn fraction(count: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryShare {
    pub value: i64,
    pub count: u64,
    pub fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellDistribution {
    pub key: CellKey,
    pub total: u64,
    /// One entry per category value, ascending.
    pub shares: Vec<CategoryShare>,
}

impl CellDistribution {
    pub fn share(&self, value: i64) -> Option<&CategoryShare> {
        self.shares.iter().find(|share| share.value == value)
    }
}

/// Complete year × impact group × value grid for one family.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseDistribution {
    pub family: CategoryFamily,
    /// Sorted by year, then impact group.
    pub cells: Vec<CellDistribution>,
}

impl DenseDistribution {
    pub fn cell(&self, key: CellKey) -> Option<&CellDistribution> {
        self.cells
            .binary_search_by(|cell| cell.key.cmp(&key))
            .ok()
            .map(|index| &self.cells[index])
    }
}

/// Fills every (year, impact group, value) slot, defaulting absent counts to zero.
///
/// Fails when `values` spans more than [`MAX_CATEGORY_CAP`] buckets.
pub fn densify(
    aggregate: &CategoryAggregate,
    family: CategoryFamily,
    values: RangeInclusive<i64>,
) -> Result<DenseDistribution, TransformError> {
    let (start, end) = (*values.start(), *values.end());
    if i128::from(end) - i128::from(start) >= i128::from(MAX_CATEGORY_CAP) {
        return Err(TransformError::ValueRange {
            start,
            end,
            max: MAX_CATEGORY_CAP,
        });
    }

    let mut cells = Vec::with_capacity(aggregate.years.len() * IMPACT_GROUPS.len());

    for &year in &aggregate.years {
        for group in IMPACT_GROUPS {
            let key = CellKey::new(year, group);
            let total = aggregate.total(key);
            let shares = values
                .clone()
                .map(|value| {
                    let count = aggregate.count(key, value);
                    CategoryShare {
                        value,
                        count,
                        fraction: fraction(count, total),
                    }
                })
                .collect();
            cells.push(CellDistribution { key, total, shares });
        }
    }

    Ok(DenseDistribution { family, cells })
}
