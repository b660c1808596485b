// ============================================================
// Layer 4 - Missing Value Imputer
// ============================================================
// Most-frequent-value imputation.
//
// fit() looks at the TRAINING partition only and records one
// fill value per column (ties go to the smallest value). The
// fitted imputer then fills train, validation and test with the
// same values; validation and test never influence them.
//
// Numeric columns are counted as f64 and keep their dtype after
// filling; every other column is counted and filled as text.
// A column with no observed value at all has no mode, and fit()
// refuses it instead of inventing a fill value.

use std::collections::HashMap;

use polars::prelude::*;

use crate::domain::dataset::is_numeric;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::Transform;

#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeImputer {
    /// (column name, fill value) in the training column order
    fill_values: Vec<(String, FillValue)>,
}

impl ModeImputer {
    pub fn fit(train: &DataFrame) -> PipelineResult<Self> {
        let fill_values = train
            .get_columns()
            .iter()
            .map(|column| {
                let name = column.name().to_string();
                most_frequent(column.as_materialized_series())?
                    .map(|mode| (name.clone(), mode))
                    .ok_or(PipelineError::NoModeAvailable { column: name })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        tracing::debug!("Imputer fit on {} training rows", train.height());
        Ok(Self { fill_values })
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }
}

/// Mode of the non-null values; None when everything is null
fn most_frequent(series: &Series) -> PipelineResult<Option<FillValue>> {
    if is_numeric(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for v in cast.f64()?.into_iter().flatten() {
            *counts.entry(v.to_bits()).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(bits, n)| (f64::from_bits(bits), n))
            .max_by(|(va, na), (vb, nb)| na.cmp(nb).then_with(|| vb.total_cmp(va)))
            .map(|(v, _)| FillValue::Number(v)))
    } else {
        let cast = series.cast(&DataType::String)?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for v in cast.str()?.into_iter().flatten() {
            *counts.entry(v).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .max_by(|(va, na), (vb, nb)| na.cmp(nb).then_with(|| vb.cmp(va)))
            .map(|(v, _)| FillValue::Text(v.to_string())))
    }
}

fn fill_series(series: &Series, fill: &FillValue) -> PipelineResult<Series> {
    let name = series.name().clone();
    match fill {
        FillValue::Number(val) => {
            let cast = series.cast(&DataType::Float64)?;
            let filled: Float64Chunked = cast.f64()?.into_iter().map(|o| Some(o.unwrap_or(*val))).collect();
            Ok(filled.with_name(name).into_series().cast(series.dtype())?)
        }
        FillValue::Text(val) => {
            let cast = series.cast(&DataType::String)?;
            let filled: StringChunked = cast
                .str()?
                .into_iter()
                .map(|o| Some(o.unwrap_or(val.as_str()).to_string()))
                .collect();
            Ok(filled.with_name(name).into_series())
        }
    }
}

impl Transform for ModeImputer {
    fn name(&self) -> &'static str { "mode_imputer" }

    fn transform(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        let mut out = df.clone();
        for column in df.get_columns() {
            let fill = self.fill_value(column.name()).ok_or_else(|| {
                PipelineError::SchemaMismatch(format!("column '{}' was not seen when the imputer was fit", column.name()))
            })?;
            if column.null_count() == 0 {
                continue;
            }
            out.with_column(fill_series(column.as_materialized_series(), fill)?)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::{dataset, floats, texts};

    #[test]
    fn test_mode_comes_from_training_only() {
        // train column: [1, 1, 2, missing] → mode 1
        let train = dataset(&["f"], &[&["1"], &["1"], &["2"], &[""]]);
        // validation is dominated by 2, which must not matter
        let val = dataset(&["f"], &[&["2"], &["2"], &["2"], &[""]]);

        let imputer = ModeImputer::fit(&train).unwrap();
        assert_eq!(imputer.fill_value("f"), Some(&FillValue::Number(1.0)));

        let train_out = imputer.transform(&train).unwrap();
        let val_out = imputer.transform(&val).unwrap();
        assert_eq!(floats(&train_out, "f")[3], Some(1.0));
        assert_eq!(floats(&val_out, "f"), vec![Some(2.0), Some(2.0), Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_integer_column_keeps_its_dtype() {
        let train = dataset(&["n"], &[&["4"], &[""], &["4"]]);
        let out = ModeImputer::fit(&train).unwrap().transform(&train).unwrap();
        assert_eq!(out.column("n").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("n").unwrap().null_count(), 0);
    }

    #[test]
    fn test_text_gaps_filled_with_mode() {
        let train = dataset(&["c"], &[&["red"], &["blue"], &["red"], &[""]]);
        let out = ModeImputer::fit(&train).unwrap().transform(&train).unwrap();
        assert_eq!(texts(&out, "c")[3].as_deref(), Some("red"));
    }

    #[test]
    fn test_all_missing_column_has_no_mode() {
        let train = dataset(&["ok", "empty"], &[&["a", ""], &["b", ""]]);
        match ModeImputer::fit(&train) {
            Err(PipelineError::NoModeAvailable { column }) => assert_eq!(column, "empty"),
            other => panic!("expected NoModeAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_ties_pick_smallest_value() {
        let train = dataset(&["c"], &[&["b"], &["a"], &["b"], &["a"]]);
        let imputer = ModeImputer::fit(&train).unwrap();
        assert_eq!(imputer.fill_value("c"), Some(&FillValue::Text("a".into())));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let imputer = ModeImputer::fit(&dataset(&["a"], &[&["1"]])).unwrap();
        assert!(imputer.transform(&dataset(&["b"], &[&["1"]])).is_err());
    }
}
