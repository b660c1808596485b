// ============================================================
// Layer 4 - Tabular Dataset (Burn)
// ============================================================
// Bridges a processed partition into Burn's Dataset trait.
//
//   processed features  [n, num_cols]     → TabularSample::features
//   one-hot labels      [n, num_classes]  → TabularSample::class
//
// The one-hot row is collapsed to its argmax: both loss functions
// train on class indices, and a sigmoid output reads index 0/1 as
// the binary target.

use burn::data::dataset::Dataset as BurnDataset;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::is_numeric;
use crate::domain::error::{PipelineError, PipelineResult};

/// One processed row ready for batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularSample {
    pub features: Vec<f32>,
    pub class:    usize,
}

#[derive(Debug, Clone)]
pub struct TabularDataset {
    samples:     Vec<TabularSample>,
    num_classes: usize,
}

impl TabularDataset {
    /// Pair every feature row with the argmax of its one-hot label row
    pub fn from_processed(features: &DataFrame, labels: &DataFrame) -> PipelineResult<Self> {
        if features.height() != labels.height() {
            return Err(PipelineError::SchemaMismatch(format!(
                "{} feature rows but {} label rows",
                features.height(),
                labels.height()
            )));
        }

        let x = numeric_columns(features)?;
        let y = numeric_columns(labels)?;
        let samples = (0..features.height())
            .map(|row| {
                Ok(TabularSample {
                    features: x.iter().map(|col| col[row] as f32).collect(),
                    class:    hot_index(&y, row)?,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self { samples, num_classes: labels.width() })
    }

    #[cfg(test)]
    pub fn new(samples: Vec<TabularSample>, num_classes: usize) -> Self {
        Self { samples, num_classes }
    }

    pub fn num_classes(&self) -> usize { self.num_classes }
}

/// Every column as f64; text or missing cells are rejected
fn numeric_columns(df: &DataFrame) -> PipelineResult<Vec<Vec<f64>>> {
    df.get_columns()
        .iter()
        .map(|column| {
            if !is_numeric(column.dtype()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "processed column '{}' holds {}, expected numbers",
                    column.name(),
                    column.dtype()
                )));
            }
            if column.null_count() > 0 {
                return Err(PipelineError::SchemaMismatch(format!(
                    "processed column '{}' has {} missing values",
                    column.name(),
                    column.null_count()
                )));
            }
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast.f64()?.into_no_null_iter().collect())
        })
        .collect()
}

fn hot_index(label_columns: &[Vec<f64>], row: usize) -> PipelineResult<usize> {
    label_columns
        .iter()
        .enumerate()
        .map(|(i, col)| (i, col[row]))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .filter(|(_, n)| *n > 0.0)
        .map(|(i, _)| i)
        .ok_or_else(|| PipelineError::SchemaMismatch(format!("label row {row} is not one-hot encoded")))
}

impl BurnDataset<TabularSample> for TabularDataset {
    fn get(&self, index: usize) -> Option<TabularSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
