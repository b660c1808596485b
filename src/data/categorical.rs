// ============================================================
// Layer 4 - Categorical Encoder
// ============================================================
// Integer-codes every categorical feature column.
//
// The mapping is built from the POOLED train + validation + test
// values (first appearance → 0, next new value → 1, ...), unlike
// the imputer and scaler which only look at train. Pooling means
// validation/test can never hold an unmapped category; it also
// means their category sets leak into the encoding.
//
// A missing cell is a category of its own and gets a code at its
// first appearance like any other value.

use std::collections::HashMap;

use polars::prelude::*;

use crate::domain::dataset::{require_column, stack, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::schema::{ColumnSchema, ColumnType};
use crate::domain::traits::Transform;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMapping {
    pub column:     String,
    /// Distinct values in code order; None is the missing category
    pub categories: Vec<Option<String>>,
    index:          HashMap<Option<String>, usize>,
}

impl CategoryMapping {
    fn from_series(series: &Series) -> PipelineResult<Self> {
        let text = series.cast(&DataType::String)?;
        let mut categories = Vec::new();
        let mut index = HashMap::new();
        for v in text.str()?.into_iter() {
            let key = v.map(String::from);
            if !index.contains_key(&key) {
                index.insert(key.clone(), categories.len());
                categories.push(key);
            }
        }
        Ok(Self { column: series.name().to_string(), categories, index })
    }

    pub fn code(&self, value: Option<&str>) -> Option<usize> {
        self.index.get(&value.map(String::from)).copied()
    }

    fn encode(&self, series: &Series) -> PipelineResult<Series> {
        let text = series.cast(&DataType::String)?;
        let codes = text
            .str()?
            .into_iter()
            .map(|v| {
                self.code(v).map(|c| c as i64).ok_or_else(|| PipelineError::UnseenCategory {
                    column: self.column.clone(),
                    value:  v.unwrap_or("<missing>").to_string(),
                })
            })
            .collect::<PipelineResult<Vec<i64>>>()?;
        Ok(Series::new(self.column.as_str().into(), codes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEncoder {
    mappings: Vec<CategoryMapping>,
}

impl CategoricalEncoder {
    /// Fit on all three partitions pooled in train → val → test order.
    /// Only non-label columns declared categorical are encoded.
    pub fn fit(partitions: &Partitions<DataFrame>, schema: &ColumnSchema) -> PipelineResult<Self> {
        let pooled = stack(&[&partitions.train, &partitions.validation, &partitions.test])?;
        let mappings = schema
            .columns_of(&pooled, ColumnType::Categorical)
            .iter()
            .map(|name| CategoryMapping::from_series(require_column(&pooled, name)?))
            .collect::<PipelineResult<Vec<_>>>()?;

        for m in &mappings {
            tracing::debug!("Category mapping '{}': {} values", m.column, m.categories.len());
        }
        Ok(Self { mappings })
    }

    #[cfg(test)]
    pub fn mapping(&self, column: &str) -> Option<&CategoryMapping> {
        self.mappings.iter().find(|m| m.column == column)
    }
}

impl Transform for CategoricalEncoder {
    fn name(&self) -> &'static str { "categorical_encoder" }

    fn transform(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        let mut out = df.clone();
        for mapping in &self.mappings {
            let codes = mapping.encode(require_column(df, &mapping.column)?)?;
            out.with_column(codes)?;
        }
        Ok(out)
    }
}
