// ============================================================
// Layer 4 - Train/Validation/Test Splitter
// ============================================================
// Shuffles the uploaded dataset and cuts it into the three
// partitions:
//   train      = round(n * trainSize)
//   validation = round(n * validationSize)   (clamped to what is left)
//   test       = the remainder
//
// Ratios are validated before any row is touched.
// Uses a seeded Fisher-Yates shuffle via rand::seq::SliceRandom;
// the shuffled row indices are gathered with DataFrame::take.

use polars::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use crate::domain::dataset::Partitions;
use crate::domain::error::PipelineResult;
use crate::domain::options::SplitRatios;

/// Row counts reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    pub train_size:      usize,
    pub validation_size: usize,
    pub test_size:       usize,
    pub total_size:      usize,
}

pub fn split_partitions(
    dataset: &DataFrame,
    ratios:  SplitRatios,
    seed:    u64,
) -> PipelineResult<(Partitions<DataFrame>, SplitSizes)> {
    ratios.validate()?;

    let total = dataset.height();
    let mut order: Vec<IdxSize> = (0..total as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train_end = (((total as f64) * ratios.train_size).round() as usize).min(total);
    let val_len   = ((total as f64) * ratios.validation_size).round() as usize;
    let val_end   = (train_end + val_len).min(total);

    let rows = |range: &[IdxSize]| dataset.take(&IdxCa::from_vec("idx".into(), range.to_vec()));
    let partitions = Partitions::new(
        rows(&order[..train_end])?,
        rows(&order[train_end..val_end])?,
        rows(&order[val_end..])?,
    );

    let sizes = SplitSizes {
        train_size:      train_end,
        validation_size: val_end - train_end,
        test_size:       total - val_end,
        total_size:      total,
    };

    tracing::debug!(
        "Dataset split: {} train, {} validation, {} test",
        sizes.train_size,
        sizes.validation_size,
        sizes.test_size
    );

    Ok((partitions, sizes))
}
