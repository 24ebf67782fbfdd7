use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, UInt8Array};
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::config::IMPACT_THRESHOLD;
use crate::errors::TransformError;
use crate::table::{labeled_schema, CIP_COUNT, SA_COUNT, SCORE, YEAR};

/// Binary citation-impact label. Missing scores fall below the threshold.
pub fn impact_group(score: Option<f64>) -> u8 {
    match score {
        Some(z) if z >= IMPACT_THRESHOLD => 1,
        _ => 0,
    }
}

pub fn cap_count(count: i64, cap: i64) -> i64 {
    count.min(cap)
}

fn capped(counts: &Int64Array, cap: i64) -> ArrayRef {
    Arc::new(Int64Array::from_iter(
        counts.iter().map(|count| count.map(|n| cap_count(n, cap))),
    ))
}

/// Adds the impact label and clips both category counts at `category_cap`.
///
/// The input is a loader table; the result follows [`labeled_schema`].
pub fn label_and_cap(
    batch: &RecordBatch,
    category_cap: i64,
) -> Result<RecordBatch, TransformError> {
    let years = typed_column!(batch, YEAR, Int64Array, "Int64");
    let scores = typed_column!(batch, SCORE, Float64Array, "Float64");
    let sa_counts = typed_column!(batch, SA_COUNT, Int64Array, "Int64");
    let cip_counts = typed_column!(batch, CIP_COUNT, Int64Array, "Int64");

    let groups = UInt8Array::from_iter_values(scores.iter().map(impact_group));
    let high_impact = groups.values().iter().filter(|&&g| g == 1).count();
    info!(
        "Labeled {} articles ({} high impact), capping category counts at {}",
        batch.num_rows(),
        high_impact,
        category_cap
    );

    let years: ArrayRef = Arc::new(years.clone());
    let scores: ArrayRef = Arc::new(scores.clone());
    let groups: ArrayRef = Arc::new(groups);
    let labeled = record_batch!(
        labeled_schema(),
        years,
        scores,
        capped(sa_counts, category_cap),
        capped(cip_counts, category_cap),
        groups,
    )?;

    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{article_schema, IMPACT_GROUP};

    fn article_batch(rows: &[(i64, Option<f64>, Option<i64>, Option<i64>)]) -> RecordBatch {
        let years: ArrayRef = Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0)));
        let scores: ArrayRef = Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.1)));
        let sa: ArrayRef = Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.2)));
        let cip: ArrayRef = Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.3)));
        record_batch!(article_schema(), years, scores, sa, cip).unwrap()
    }

    fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> &'a T {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<T>()
            .unwrap()
    }

    #[test]
    fn zero_score_is_high_impact() {
        assert_eq!(impact_group(Some(0.0)), 1);
        assert_eq!(impact_group(Some(-0.0)), 1);
        assert_eq!(impact_group(Some(3.2)), 1);
        assert_eq!(impact_group(Some(-1e-9)), 0);
        assert_eq!(impact_group(None), 0);
    }

    #[test]
    fn counts_are_capped_not_shifted() {
        assert_eq!(cap_count(0, 4), 0);
        assert_eq!(cap_count(3, 4), 3);
        assert_eq!(cap_count(4, 4), 4);
        assert_eq!(cap_count(11, 4), 4);
    }

    #[test]
    fn label_and_cap_derives_new_columns() {
        let batch = article_batch(&[
            (2010, Some(-1.0), Some(2), Some(3)),
            (2010, Some(5.0), Some(5), Some(1)),
            (2011, Some(0.0), None, Some(9)),
            (2011, None, Some(4), None),
        ]);

        let labeled = label_and_cap(&batch, 4).unwrap();
        assert_eq!(*labeled.schema(), labeled_schema());

        let groups = column::<UInt8Array>(&labeled, IMPACT_GROUP);
        assert_eq!(groups.values().to_vec(), vec![0, 1, 1, 0]);

        let sa = column::<Int64Array>(&labeled, SA_COUNT);
        assert_eq!(sa.iter().collect::<Vec<_>>(), vec![Some(2), Some(4), None, Some(4)]);
        let cip = column::<Int64Array>(&labeled, CIP_COUNT);
        assert_eq!(cip.iter().collect::<Vec<_>>(), vec![Some(3), Some(1), Some(4), None]);

        // raw score survives so the label can be audited
        let scores = column::<Float64Array>(&labeled, SCORE);
        assert_eq!(scores.value(1), 5.0);
    }

    #[test]
    fn wrong_column_type_is_reported() {
        let years: ArrayRef = Arc::new(Float64Array::from(vec![2010.0]));
        let scores: ArrayRef = Arc::new(Float64Array::from(vec![1.0]));
        let sa: ArrayRef = Arc::new(Int64Array::from(vec![1]));
        let cip: ArrayRef = Arc::new(Int64Array::from(vec![1]));
        let batch = RecordBatch::try_from_iter(vec![
            (YEAR, years),
            (SCORE, scores),
            (SA_COUNT, sa),
            (CIP_COUNT, cip),
        ])
        .unwrap();

        let err = label_and_cap(&batch, 4).unwrap_err();
        assert!(matches!(err, TransformError::ColumnType { ref column, .. } if column == YEAR));
    }
}
