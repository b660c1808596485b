// ============================================================
// Layer 4 - Label Encoder
// ============================================================
// Turns the popped label column into one-hot rows.
//
//   1. pool labels:  train ++ validation ++ test
//   2. assign class indices in first-appearance order (stable
//      for a given input, so every run on the same data agrees)
//   3. one-hot the pooled vector: width = number of classes
//   4. slice back by the ORIGINAL row counts:
//        [0, n_train)                      → train
//        [n_train, n_train + n_val)        → validation
//        [n_train + n_val, end)            → test
//
// Like the categorical encoder, the class mapping is fit on the
// pooled partitions. Labels are compared as text, so 1 and "1"
// are the same class.

use std::collections::HashMap;

use polars::prelude::*;

use crate::domain::dataset::Partitions;
use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index:   HashMap<String, usize>,
}

fn label_texts(series: &Series) -> PipelineResult<Vec<Option<String>>> {
    let text = series.cast(&DataType::String)?;
    Ok(text.str()?.into_iter().map(|v| v.map(String::from)).collect())
}

impl LabelEncoder {
    pub fn fit(labels: &Partitions<Series>) -> PipelineResult<Self> {
        let mut classes = Vec::new();
        let mut index = HashMap::new();
        for (partition, series) in labels.iter() {
            for (row, v) in label_texts(series)?.into_iter().enumerate() {
                let v = v.ok_or_else(|| {
                    PipelineError::SchemaMismatch(format!("label is missing in {partition} row {row}"))
                })?;
                if !index.contains_key(&v) {
                    index.insert(v.clone(), classes.len());
                    classes.push(v);
                }
            }
        }
        tracing::info!("Label encoder: {} classes {:?}", classes.len(), classes);
        Ok(Self { classes, index })
    }

    pub fn num_classes(&self) -> usize { self.classes.len() }

    #[cfg(test)]
    pub fn classes(&self) -> &[String] { &self.classes }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// One-hot encode the pooled labels and re-split them by the original counts
    pub fn encode(&self, labels: &Partitions<Series>) -> PipelineResult<Partitions<DataFrame>> {
        let width = self.num_classes();
        let mut hot = Vec::new();
        for (_, series) in labels.iter() {
            for v in label_texts(series)? {
                let v = v.unwrap_or_default();
                let Some(idx) = self.class_index(&v) else {
                    return Err(PipelineError::UnseenCategory { column: series.name().to_string(), value: v });
                };
                hot.push(idx);
            }
        }

        let columns: Vec<Column> = (0..width)
            .map(|i| {
                let bits: Vec<i64> = hot.iter().map(|&h| i64::from(h == i)).collect();
                Column::new(i.to_string().into(), bits)
            })
            .collect();
        let pooled = DataFrame::new(columns)?;

        let n_train = labels.train.len();
        let n_val = labels.validation.len();
        Ok(Partitions::new(
            pooled.slice(0, n_train),
            pooled.slice(n_train as i64, n_val),
            pooled.slice((n_train + n_val) as i64, labels.test.len()),
        ))
    }
}
