// ============================================================
// Layer 3 - Column Schema
// ============================================================
// The declared data type of every column, recorded once from
// the dataset before it was split, plus the chosen label column.
// The same schema drives processing of all three partitions.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{column_names, require_column};
use crate::domain::error::{PipelineError, PipelineResult};

/// Semantic role a declared dtype maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Label,
    /// Declared but neither scaled nor encoded (bool, datetime, ...)
    Other,
}

impl ColumnType {
    pub fn from_dtype(dtype: &str) -> Self {
        match dtype {
            "int64" | "float64" | "int32" | "float32" => ColumnType::Numeric,
            "object" | "category"                      => ColumnType::Categorical,
            _                                          => ColumnType::Other,
        }
    }
}

/// `{"label_column": "..."}` as stored by label selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSelection {
    pub label_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    label_column: String,
    dtypes:       BTreeMap<String, String>,
}

impl ColumnSchema {
    /// The label column must appear among the declared types
    pub fn new(label_column: impl Into<String>, dtypes: BTreeMap<String, String>) -> PipelineResult<Self> {
        let label_column = label_column.into();
        if !dtypes.contains_key(&label_column) {
            return Err(PipelineError::SchemaMismatch(format!(
                "label column '{label_column}' is not in the declared column types"
            )));
        }
        Ok(Self { label_column, dtypes })
    }

    pub fn label_column(&self) -> &str { &self.label_column }

    pub fn column_type(&self, column: &str) -> ColumnType {
        if column == self.label_column {
            return ColumnType::Label;
        }
        self.dtypes
            .get(column)
            .map(|d| ColumnType::from_dtype(d))
            .unwrap_or(ColumnType::Other)
    }

    /// Columns of `df` that carry the given semantic type, in frame order
    pub fn columns_of(&self, df: &DataFrame, kind: ColumnType) -> Vec<String> {
        column_names(df)
            .into_iter()
            .filter(|c| self.column_type(c) == kind)
            .collect()
    }

    /// The frame must contain the label column
    pub fn check_dataset(&self, df: &DataFrame) -> PipelineResult<()> {
        require_column(df, &self.label_column).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dtypes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_label_must_be_declared() {
        let err = ColumnSchema::new("y", dtypes(&[("a", "int64")]));
        assert!(matches!(err, Err(PipelineError::SchemaMismatch(_))));
    }

    #[test]
    fn test_label_overrides_declared_type() {
        let schema = ColumnSchema::new("y", dtypes(&[("a", "float64"), ("c", "object"), ("y", "object")])).unwrap();
        assert_eq!(schema.column_type("a"), ColumnType::Numeric);
        assert_eq!(schema.column_type("c"), ColumnType::Categorical);
        assert_eq!(schema.column_type("y"), ColumnType::Label);
        assert_eq!(schema.column_type("unknown"), ColumnType::Other);
    }

    #[test]
    fn test_columns_of_follows_frame_order() {
        use polars::prelude::*;
        let schema = ColumnSchema::new("y", dtypes(&[("a", "float64"), ("b", "object"), ("c", "int64"), ("y", "object")])).unwrap();
        let df = DataFrame::new(vec![
            Column::new("c".into(), &[1i64]),
            Column::new("y".into(), &["p"]),
            Column::new("a".into(), &[0.5f64]),
            Column::new("b".into(), &["q"]),
        ])
        .unwrap();
        assert_eq!(schema.columns_of(&df, ColumnType::Numeric), vec!["c".to_string(), "a".to_string()]);
        assert_eq!(schema.columns_of(&df, ColumnType::Categorical), vec!["b".to_string()]);
        assert!(schema.check_dataset(&df).is_ok());
        assert!(schema.check_dataset(&df.drop("y").unwrap()).is_err());
    }
}
