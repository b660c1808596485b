// ============================================================
// Layer 4 - Partition Reconciler
// ============================================================
// Removes rows that occur more than once across the union of
// train, validation and test.
//
//   1. tag every row with its origin partition
//   2. vstack in train → val → test order
//   3. unique_stable over the data columns, keeping the first
//      copy (the origin tag is never compared)
//   4. regroup by origin tag and drop the tag
//
// The first copy wins, so a test row that duplicates a train row
// is dropped from test. Row order inside each partition is kept.

use polars::prelude::*;

use crate::domain::dataset::{column_names, Partition, Partitions};
use crate::domain::error::PipelineResult;

const ORIGIN_COLUMN: &str = "__origin";

fn origin_code(partition: Partition) -> u32 {
    match partition {
        Partition::Train      => 0,
        Partition::Validation => 1,
        Partition::Test       => 2,
    }
}

pub fn reconcile(partitions: &Partitions<DataFrame>, remove_duplicates: bool) -> PipelineResult<Partitions<DataFrame>> {
    if !remove_duplicates {
        return Ok(partitions.clone());
    }
    let partitions = partitions.aligned()?;
    let data_columns = column_names(&partitions.train);

    let mut union = DataFrame::empty();
    for (origin, df) in partitions.iter() {
        let mut tagged = df.clone();
        tagged.with_column(Series::new(ORIGIN_COLUMN.into(), vec![origin_code(origin); df.height()]))?;
        if union.width() == 0 {
            union = tagged;
        } else {
            union.vstack_mut(&tagged)?;
        }
    }
    let unique = union.unique_stable(Some(data_columns.as_slice()), UniqueKeepStrategy::First, None)?;

    let origins = unique.column(ORIGIN_COLUMN)?.u32()?.clone();
    let reconciled = partitions.try_map(|p, _| -> PipelineResult<DataFrame> {
        Ok(unique.filter(&origins.equal(origin_code(p)))?.drop(ORIGIN_COLUMN)?)
    })?;

    let before = partitions.row_counts();
    let after  = reconciled.row_counts();
    tracing::info!(
        "Duplicate removal: train {}→{}, val {}→{}, test {}→{}",
        before.train, after.train,
        before.validation, after.validation,
        before.test, after.test
    );
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::{dataset, texts};

    fn fixture() -> Partitions<DataFrame> {
        Partitions::new(
            dataset(&["a", "b"], &[&["1", "x"], &["2", "y"], &["1", "x"]]),
            dataset(&["a", "b"], &[&["3", "z"], &["2", "y"]]),
            dataset(&["a", "b"], &[&["4", "w"], &["1", "x"], &["5", "v"]]),
        )
    }

    #[test]
    fn test_no_duplicates_survive_across_partitions() {
        let out = reconcile(&fixture(), true).unwrap();
        let union = crate::domain::dataset::stack(&[&out.train, &out.validation, &out.test]).unwrap();
        let unique = union.unique_stable(None, UniqueKeepStrategy::First, None).unwrap();
        assert_eq!(unique.height(), union.height());
        assert_eq!(out.row_counts(), Partitions::new(2, 1, 2));
    }

    #[test]
    fn test_first_copy_wins_and_order_is_kept() {
        let out = reconcile(&fixture(), true).unwrap();
        assert!(out.train.equals_missing(&dataset(&["a", "b"], &[&["1", "x"], &["2", "y"]])));
        assert!(out.validation.equals_missing(&dataset(&["a", "b"], &[&["3", "z"]])));
        assert!(out.test.equals_missing(&dataset(&["a", "b"], &[&["4", "w"], &["5", "v"]])));
    }

    #[test]
    fn test_rows_with_gaps_compare_equal() {
        let parts = Partitions::new(
            dataset(&["a", "b"], &[&["", "x"]]),
            dataset(&["a", "b"], &[&["", "x"], &["1", "y"]]),
            dataset(&["a", "b"], &[&["2", "z"]]),
        );
        let out = reconcile(&parts, true).unwrap();
        assert_eq!(out.row_counts(), Partitions::new(1, 1, 1));
        assert_eq!(texts(&out.validation, "b"), vec![Some("y".to_string())]);
    }

    #[test]
    fn test_disabled_returns_inputs_unchanged() {
        let input = fixture();
        let out = reconcile(&input, false).unwrap();
        for ((_, a), (_, b)) in input.iter().zip(out.iter()) {
            assert!(a.equals_missing(b));
        }
    }
}
