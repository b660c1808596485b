// ============================================================
// Layer 3 - Frames and Partitions
// ============================================================
// Tabular data travels as polars DataFrames. Missing cells are
// polars nulls. No stage mutates its input frame: every pipeline
// step hands back a new one.
//
// The helpers here cover what every layer needs from a frame:
// named column lookup, popping the label, and stacking frames
// whose inferred dtypes disagree (a partition with no decimals
// reads as Int64 while its sibling reads as Float64).
//
// Partitions bundles the three role-tagged values (train /
// validation / test) that flow through processing.

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> PipelineResult<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PipelineError::SchemaMismatch(format!("column '{name}' is not in the dataset")))
}

/// Split off one column, returning (remaining frame, popped series)
pub fn pop_column(df: &DataFrame, name: &str) -> PipelineResult<(DataFrame, Series)> {
    let popped = require_column(df, name)?.clone();
    Ok((df.drop(name)?, popped))
}

pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Give every column one dtype across `frames`. Columns that
/// already agree are left alone; otherwise the column becomes
/// Float64 when each frame holds only numbers or nulls, String
/// when it does not. All frames must share the column list.
pub fn align_dtypes(frames: &[&DataFrame]) -> PipelineResult<Vec<DataFrame>> {
    let mut out: Vec<DataFrame> = frames.iter().map(|df| (*df).clone()).collect();
    let Some(first) = frames.first() else {
        return Ok(out);
    };

    for name in column_names(first) {
        let columns = frames
            .iter()
            .map(|df| df.column(&name))
            .collect::<PolarsResult<Vec<_>>>()?;
        let dtype = columns[0].dtype();
        if columns.iter().all(|c| c.dtype() == dtype) {
            continue;
        }

        let target = if columns.iter().all(|c| is_numeric(c.dtype()) || c.null_count() == c.len()) {
            DataType::Float64
        } else {
            DataType::String
        };
        tracing::debug!("Column '{}' read with differing dtypes, aligned to {}", name, target);
        for df in out.iter_mut() {
            let cast = df.column(&name)?.cast(&target)?;
            df.with_column(cast)?;
        }
    }
    Ok(out)
}

/// Stack frames vertically; all parts must share the same column list
pub fn stack(parts: &[&DataFrame]) -> PipelineResult<DataFrame> {
    let Some(first) = parts.first() else {
        return Ok(DataFrame::empty());
    };
    let columns = column_names(first);
    for part in parts {
        if column_names(part) != columns {
            return Err(PipelineError::SchemaMismatch(format!(
                "cannot stack datasets with columns {:?} and {:?}",
                columns,
                column_names(part)
            )));
        }
    }

    let aligned = align_dtypes(parts)?;
    let mut stacked = aligned[0].clone();
    for part in &aligned[1..] {
        stacked.vstack_mut(part)?;
    }
    Ok(stacked)
}

// ─── Partition ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    #[serde(rename = "val")]
    Validation,
    Test,
}

impl Partition {
    /// Train first, then validation, then test. Pooled operations rely on this order.
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validation, Partition::Test];

    pub fn tag(&self) -> &'static str {
        match self {
            Partition::Train      => "train",
            Partition::Validation => "val",
            Partition::Test       => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One value per partition
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions<T> {
    pub train:      T,
    pub validation: T,
    pub test:       T,
}

impl<T> Partitions<T> {
    pub fn new(train: T, validation: T, test: T) -> Self {
        Self { train, validation, test }
    }

    pub fn get(&self, partition: Partition) -> &T {
        match partition {
            Partition::Train      => &self.train,
            Partition::Validation => &self.validation,
            Partition::Test       => &self.test,
        }
    }

    /// In Partition::ALL order
    pub fn iter(&self) -> impl Iterator<Item = (Partition, &T)> {
        Partition::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    pub fn try_map<U, E, F>(&self, mut f: F) -> Result<Partitions<U>, E>
    where
        F: FnMut(Partition, &T) -> Result<U, E>,
    {
        Ok(Partitions {
            train:      f(Partition::Train, &self.train)?,
            validation: f(Partition::Validation, &self.validation)?,
            test:       f(Partition::Test, &self.test)?,
        })
    }
}

impl Partitions<DataFrame> {
    /// All three partitions must carry identical column lists
    pub fn check_same_columns(&self) -> PipelineResult<()> {
        let train = column_names(&self.train);
        for (partition, df) in self.iter() {
            let columns = column_names(df);
            if columns != train {
                return Err(PipelineError::SchemaMismatch(format!(
                    "{partition} partition columns {columns:?} differ from train columns {train:?}"
                )));
            }
        }
        Ok(())
    }

    /// Same column list checked, then one dtype per column across the partitions
    pub fn aligned(&self) -> PipelineResult<Self> {
        self.check_same_columns()?;
        let [train, validation, test]: [DataFrame; 3] = align_dtypes(&[&self.train, &self.validation, &self.test])?
            .try_into()
            .map_err(|_| PipelineError::SchemaMismatch("expected three partitions".into()))?;
        Ok(Self { train, validation, test })
    }

    pub fn row_counts(&self) -> Partitions<usize> {
        Partitions::new(self.train.height(), self.validation.height(), self.test.height())
    }
}
