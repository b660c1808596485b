// ============================================================
// Layer 2 - CompareUseCase
// ============================================================
// Before/after data-quality snapshot of a processing run.
//
//   before: dataset.csv (or the raw partitions stacked when the
//           uploaded table is gone)
//   after:  processed_train/val/test.csv stacked, with the
//           original label column from processed_combined_y.csv
//           appended
//
// Read-only: no lock is taken and nothing is written.

use anyhow::{Context, Result};
use polars::prelude::DataFrame;

use crate::data::{
    loader::{read_dataset, stack_files},
    profile::ComparisonReport,
};
use crate::domain::error::PipelineError;
use crate::infra::artifacts::{Workspace, COMBINED_LABELS_FILE};

pub struct CompareUseCase {
    workspace: Workspace,
}

impl CompareUseCase {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    pub fn execute(&self) -> Result<ComparisonReport> {
        let original = self.original()?;
        let processed = self.processed()?;
        tracing::info!(
            "Comparing {} original rows with {} processed rows",
            original.height(),
            processed.height()
        );
        Ok(ComparisonReport::compare(&original, &processed)?)
    }

    fn original(&self) -> Result<DataFrame> {
        let ws = &self.workspace;
        if ws.dataset_path().exists() {
            return Ok(read_dataset(&ws.dataset_path())?);
        }
        stack_files(&ws.raw_partition_paths()).context("Neither dataset.csv nor the raw partitions are available")
    }

    fn processed(&self) -> Result<DataFrame> {
        let ws = &self.workspace;
        let mut features = stack_files(&ws.processed_features_paths()).context("Process the dataset before comparing")?;

        let labels = read_dataset(&ws.path(COMBINED_LABELS_FILE))?;
        let Some(label) = labels.get_columns().first() else {
            return Err(PipelineError::SchemaMismatch(format!("'{COMBINED_LABELS_FILE}' has no columns")).into());
        };
        features
            .with_column(label.clone())
            .with_context(|| format!("'{COMBINED_LABELS_FILE}' does not match the processed row count"))?;
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::process_use_case::ProcessUseCase;
    use crate::data::loader::write_dataset;
    use crate::data::loader::tests::dataset;
    use crate::domain::dataset::{stack, Partition};
    use crate::domain::options::ProcessingOptions;
    use crate::infra::artifacts::{COLUMN_TYPES_FILE, LABEL_COLUMN_FILE};
    use crate::domain::schema::LabelSelection;
    use std::collections::BTreeMap;

    #[test]
    fn test_processing_clears_missing_values_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();

        let train = dataset(&["f", "y"], &[&["1", "a"], &["1", "a"], &["", "b"], &["3", "b"]]);
        let val = dataset(&["f", "y"], &[&["2", "a"]]);
        let test = dataset(&["f", "y"], &[&["", "a"]]);
        let full = stack(&[&train, &val, &test]).unwrap();
        write_dataset(&ws.dataset_path(), &full).unwrap();
        write_dataset(&ws.raw_partition_path(Partition::Train), &train).unwrap();
        write_dataset(&ws.raw_partition_path(Partition::Validation), &val).unwrap();
        write_dataset(&ws.raw_partition_path(Partition::Test), &test).unwrap();
        ws.write_json(LABEL_COLUMN_FILE, &LabelSelection { label_column: "y".into() }).unwrap();
        let dtypes: BTreeMap<String, String> =
            [("f".to_string(), "float64".to_string()), ("y".to_string(), "object".to_string())].into();
        ws.write_json(COLUMN_TYPES_FILE, &dtypes).unwrap();

        let options = ProcessingOptions { remove_duplicates: true, handle_missing_values: true, ..Default::default() };
        ProcessUseCase::new(ws.clone(), options).execute().unwrap();

        let report = CompareUseCase::new(ws).execute().unwrap();
        assert_eq!(report.before.num_rows, 6);
        assert_eq!(report.before.missing_values["f"], 2);
        assert_eq!(report.before.duplicate_rows, 1);
        assert!((report.before.missing_percentage["f"] - 100.0 / 3.0).abs() < 1e-9);

        assert_eq!(report.after.num_rows, 5);
        assert_eq!(report.after.missing_values["f"], 0);
        assert_eq!(report.after.missing_values["y"], 0);
    }

    #[test]
    fn test_unprocessed_workspace_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        write_dataset(&ws.dataset_path(), &dataset(&["f"], &[&["1"]])).unwrap();
        let err = CompareUseCase::new(ws).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::MissingInput(_))));
    }
}
