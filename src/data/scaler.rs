// ============================================================
// Layer 4 - Feature Scaler
// ============================================================
// Rescales numeric, non-label feature columns.
//
//   standardization: z = (x - mean) / std      (population std)
//   normalization:   z = (x - min) / (max - min)
//
// Statistics come from the TRAINING partition only and are then
// applied unchanged to validation and test.
//
// Constant columns:
//   standardization with std = 0     → z = x - mean
//   normalization with max = min     → z = 0
//
// Nulls are ignored when fitting and stay null. Scaled columns
// come out as Float64.

use polars::prelude::*;

use crate::domain::dataset::{is_numeric, require_column};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::options::FeatureScaling;
use crate::domain::schema::{ColumnSchema, ColumnType};
use crate::domain::traits::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnStats {
    Standard { mean: f64, std: f64 },
    MinMax { min: f64, max: f64 },
}

impl ColumnStats {
    fn apply(&self, x: f64) -> f64 {
        match *self {
            ColumnStats::Standard { mean, std } if std == 0.0 => x - mean,
            ColumnStats::Standard { mean, std }               => (x - mean) / std,
            ColumnStats::MinMax { min, max } if max == min    => 0.0,
            ColumnStats::MinMax { min, max }                  => (x - min) / (max - min),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    columns: Vec<(String, ColumnStats)>,
}

impl FeatureScaler {
    /// Returns None when scaling is switched off
    pub fn fit(train: &DataFrame, schema: &ColumnSchema, method: FeatureScaling) -> PipelineResult<Option<Self>> {
        if method == FeatureScaling::None {
            return Ok(None);
        }

        let mut columns = Vec::new();
        for name in schema.columns_of(train, ColumnType::Numeric) {
            let ca = as_f64(require_column(train, &name)?)?;
            let stats = match method {
                FeatureScaling::Normalization => ca.min().zip(ca.max()).map(|(min, max)| ColumnStats::MinMax { min, max }),
                _ => ca.mean().zip(ca.std(0)).map(|(mean, std)| ColumnStats::Standard { mean, std }),
            };
            let stats = stats.ok_or_else(|| {
                PipelineError::SchemaMismatch(format!("numeric column '{name}' has no training values to fit the scaler on"))
            })?;
            tracing::debug!("Scaler stats for '{}': {:?}", name, stats);
            columns.push((name, stats));
        }
        Ok(Some(Self { columns }))
    }

    #[cfg(test)]
    pub fn stats(&self, column: &str) -> Option<ColumnStats> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, s)| *s)
    }
}

/// A declared-numeric column as f64; text cells are a schema error
fn as_f64(series: &Series) -> PipelineResult<Float64Chunked> {
    if !is_numeric(series.dtype()) && series.null_count() < series.len() {
        let text = series.cast(&DataType::String)?;
        let sample = text.str()?.into_iter().flatten().next().unwrap_or_default().to_string();
        return Err(PipelineError::SchemaMismatch(format!(
            "column '{}' is declared numeric but holds '{}'",
            series.name(),
            sample
        )));
    }
    Ok(series.cast(&DataType::Float64)?.f64()?.clone())
}

impl Transform for FeatureScaler {
    fn name(&self) -> &'static str { "feature_scaler" }

    fn transform(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        let mut out = df.clone();
        for (column, stats) in &self.columns {
            let series = require_column(df, column)?;
            let scaled: Float64Chunked = as_f64(series)?.into_iter().map(|o| o.map(|x| stats.apply(x))).collect();
            out.with_column(scaled.with_name(series.name().clone()).into_series())?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::{dataset, floats};
    use std::collections::BTreeMap;

    fn schema() -> ColumnSchema {
        let dtypes: BTreeMap<String, String> = [("x", "float64"), ("k", "int64"), ("c", "object"), ("y", "int64")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ColumnSchema::new("y", dtypes).unwrap()
    }

    fn column(df: &DataFrame, name: &str) -> Vec<f64> {
        floats(df, name).into_iter().map(|v| v.unwrap()).collect()
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_standardized_train_has_zero_mean_unit_variance() {
        let train = dataset(&["x", "k", "y"], &[&["1", "5", "0"], &["2", "5", "1"], &["3", "5", "0"], &["6", "5", "1"]]);
        let scaler = FeatureScaler::fit(&train, &schema(), FeatureScaling::Standardization).unwrap().unwrap();
        let out = scaler.transform(&train).unwrap();

        let xs = column(&out, "x");
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);

        // constant column becomes x - mean = 0, never NaN
        assert!(close(&column(&out, "k"), &[0.0; 4]));
        // label is left alone
        assert_eq!(out.column("y").unwrap().dtype(), &DataType::Int64);
        assert_eq!(column(&out, "y"), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_validation_uses_training_statistics() {
        let train = dataset(&["x", "y"], &[&["0", "0"], &["10", "1"]]);
        let val = dataset(&["x", "y"], &[&["20", "0"], &["5", "1"]]);
        let scaler = FeatureScaler::fit(&train, &schema(), FeatureScaling::Standardization).unwrap().unwrap();
        match scaler.stats("x") {
            Some(ColumnStats::Standard { mean, std }) => {
                assert!((mean - 5.0).abs() < 1e-9);
                assert!((std - 5.0).abs() < 1e-9);
            }
            other => panic!("expected standard stats, got {other:?}"),
        }
        assert!(close(&column(&scaler.transform(&val).unwrap(), "x"), &[3.0, 0.0]));
    }

    #[test]
    fn test_normalization_with_constant_column() {
        let train = dataset(&["x", "k", "y"], &[&["2", "7", "0"], &["4", "7", "1"]]);
        let val = dataset(&["x", "k", "y"], &[&["3", "9", "0"]]);
        let scaler = FeatureScaler::fit(&train, &schema(), FeatureScaling::Normalization).unwrap().unwrap();
        let out = scaler.transform(&val).unwrap();
        assert!(close(&column(&out, "x"), &[0.5]));
        assert_eq!(column(&out, "k"), vec![0.0]);
    }

    #[test]
    fn test_nulls_stay_null() {
        let train = dataset(&["x", "y"], &[&["1", "0"], &["", "1"], &["3", "0"]]);
        let scaler = FeatureScaler::fit(&train, &schema(), FeatureScaling::Normalization).unwrap().unwrap();
        let out = scaler.transform(&train).unwrap();
        assert_eq!(floats(&out, "x"), vec![Some(0.0), None, Some(1.0)]);
    }

    #[test]
    fn test_none_fits_nothing() {
        let train = dataset(&["x", "y"], &[&["1", "0"]]);
        assert!(FeatureScaler::fit(&train, &schema(), FeatureScaling::None).unwrap().is_none());
    }

    #[test]
    fn test_text_in_numeric_column_rejected() {
        let train = dataset(&["x", "y"], &[&["1", "0"], &["oops", "1"]]);
        assert!(matches!(
            FeatureScaler::fit(&train, &schema(), FeatureScaling::Standardization),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }
}
