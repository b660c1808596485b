// ============================================================
// Layer 4 - Dataset Profiler
// ============================================================
// Read-only statistics over a DataFrame:
//
//   infer_dtypes   column → "int64" | "float64" | "bool" | "object"
//   summarize      per-column type family + missing counts
//   value_counts   frequency table of one column
//   snapshot       missing / duplicate statistics for comparison
//
// ComparisonReport pairs two snapshots (original vs processed)
// and adds nothing else.

use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::require_column;
use crate::domain::error::PipelineResult;

// ─── Dtype inference ──────────────────────────────────────────────────────────

/// Declared dtype for a column read by the CSV loader
pub fn infer_dtype(series: &Series) -> &'static str {
    let has_nulls = series.null_count() > 0;
    // an all-missing column reads as floats
    if series.null_count() == series.len() {
        return "float64";
    }
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => "float64",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => if has_nulls { "float64" } else { "int64" },
        DataType::Boolean => if has_nulls { "object" } else { "bool" },
        _ => "object",
    }
}

pub fn infer_dtypes(df: &DataFrame) -> BTreeMap<String, String> {
    df.get_columns()
        .iter()
        .map(|c| (c.name().to_string(), infer_dtype(c.as_materialized_series()).to_string()))
        .collect()
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub data_type:       String,
    pub missing_values:  usize,
    pub percent_missing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Column names in file order
    pub columns:   Vec<String>,
    pub summary:   BTreeMap<String, ColumnSummary>,
    pub row_count: usize,
}

/// Type family shown to users for a declared dtype
pub fn type_family(dtype: &str) -> &'static str {
    match dtype {
        "int64" | "float64" | "int32" | "float32" => "number",
        "object" | "category"                      => "string",
        "bool"                                     => "boolean",
        _                                          => "unknown",
    }
}

pub fn summarize(df: &DataFrame) -> DataSummary {
    let rows = df.height();
    let mut columns = Vec::with_capacity(df.width());
    let mut summary = BTreeMap::new();
    for column in df.get_columns() {
        let missing = column.null_count();
        let name = column.name().to_string();
        summary.insert(name.clone(), ColumnSummary {
            data_type:       type_family(infer_dtype(column.as_materialized_series())).to_string(),
            missing_values:  missing,
            percent_missing: percent(missing, rows),
        });
        columns.push(name);
    }
    DataSummary { columns, summary, row_count: rows }
}

// ─── Value counts ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCounts {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

/// Most frequent first; equal counts keep value order. Missing cells are skipped.
pub fn value_counts(df: &DataFrame, column: &str) -> PipelineResult<ValueCounts> {
    let text = require_column(df, column)?.cast(&DataType::String)?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in text.str()?.into_iter().flatten() {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(va, ca), (vb, cb)| cb.cmp(ca).then_with(|| va.cmp(vb)));

    Ok(ValueCounts {
        labels: ranked.iter().map(|(v, _)| v.to_string()).collect(),
        values: ranked.iter().map(|(_, c)| *c).collect(),
    })
}

// ─── Quality snapshot & comparison ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySnapshot {
    pub missing_values:     BTreeMap<String, usize>,
    pub missing_percentage: BTreeMap<String, f64>,
    /// Rows equal to an earlier row
    pub duplicate_rows:     usize,
    pub num_rows:           usize,
}

pub fn snapshot(df: &DataFrame) -> PipelineResult<QualitySnapshot> {
    let rows = df.height();
    let mut missing_values = BTreeMap::new();
    let mut missing_percentage = BTreeMap::new();
    for column in df.get_columns() {
        let missing = column.null_count();
        missing_values.insert(column.name().to_string(), missing);
        missing_percentage.insert(column.name().to_string(), percent(missing, rows));
    }

    let distinct = if df.width() == 0 {
        rows
    } else {
        df.unique_stable(None, UniqueKeepStrategy::First, None)?.height()
    };

    Ok(QualitySnapshot { missing_values, missing_percentage, duplicate_rows: rows - distinct, num_rows: rows })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub before: QualitySnapshot,
    pub after:  QualitySnapshot,
}

impl ComparisonReport {
    pub fn compare(original: &DataFrame, processed: &DataFrame) -> PipelineResult<Self> {
        Ok(Self { before: snapshot(original)?, after: snapshot(processed)? })
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}
