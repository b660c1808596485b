// ============================================================
// Layer 2 - Dataset Preparation Use Cases
// ============================================================
// Everything that happens to the uploaded table before the
// processing run:
//
//   split         dataset.csv → train.csv / val.csv / test.csv
//   select_label  label_column.json + column_data_types.json
//   drop_columns  rewrite dataset.csv without some columns
//   summary       per-column type and missing counts
//   value_counts  frequency table of one column
//   save_model    validate and store model_config.json
//
// Column types are inferred once from dataset.csv, the table
// that preceded splitting, and reused for every partition.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::{read_dataset, stack_files, write_dataset},
    profile::{self, DataSummary, ValueCounts},
    splitter::{split_partitions, SplitSizes},
};
use crate::domain::dataset::{column_names, require_column};
use crate::domain::error::PipelineError;
use crate::domain::network_config::{NetworkConfig, NetworkParameters};
use crate::domain::options::SplitRatios;
use crate::domain::schema::LabelSelection;
use crate::infra::artifacts::{
    Workspace, COLUMN_TYPES_FILE, LABEL_COLUMN_FILE, MODEL_CONFIG_FILE, NETWORK_PARAMETERS_FILE,
};

/// How the uploaded table is split
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitConfig {
    pub ratios: SplitRatios,
    pub seed:   u64,
}

pub struct PrepareUseCase {
    workspace: Workspace,
}

impl PrepareUseCase {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    fn uploaded(&self) -> Result<DataFrame> {
        let path = self.workspace.dataset_path();
        read_dataset(&path).with_context(|| format!("Cannot read the uploaded dataset '{}'", path.display()))
    }

    // ─── Split ────────────────────────────────────────────────────────────────

    /// Ratios are checked before anything is written
    pub fn split(&self, cfg: SplitConfig) -> Result<SplitSizes> {
        cfg.ratios.validate()?;
        let _lock = self.workspace.lock()?;

        let dataset = self.uploaded()?;
        let (partitions, sizes) = split_partitions(&dataset, cfg.ratios, cfg.seed)?;
        for (partition, df) in partitions.iter() {
            let path = self.workspace.raw_partition_path(partition);
            write_dataset(&path, df).with_context(|| format!("Cannot write '{}'", path.display()))?;
        }

        tracing::info!(
            "Split {} rows: {} train, {} val, {} test",
            sizes.total_size, sizes.train_size, sizes.validation_size, sizes.test_size
        );
        Ok(sizes)
    }

    // ─── Label selection ──────────────────────────────────────────────────────

    /// Record the label column and the inferred column types
    pub fn select_label(&self, label_column: &str) -> Result<BTreeMap<String, String>> {
        let dataset = self.schema_source()?;
        require_column(&dataset, label_column)?;
        let dtypes = profile::infer_dtypes(&dataset);

        let _lock = self.workspace.lock()?;
        self.workspace.write_json(LABEL_COLUMN_FILE, &LabelSelection { label_column: label_column.to_string() })?;
        self.workspace.write_json(COLUMN_TYPES_FILE, &dtypes)?;

        tracing::info!("Label column set to '{}' ({} columns typed)", label_column, dtypes.len());
        Ok(dtypes)
    }

    /// dataset.csv when present, otherwise the three raw partitions stacked
    fn schema_source(&self) -> Result<DataFrame> {
        if self.workspace.dataset_path().exists() {
            return self.uploaded();
        }
        stack_files(&self.workspace.raw_partition_paths()).context("Upload a dataset or split one first")
    }

    // ─── Column dropping ──────────────────────────────────────────────────────

    pub fn drop_columns(&self, columns: &[String]) -> Result<Vec<String>> {
        let dataset = self.uploaded()?;
        for column in columns {
            require_column(&dataset, column)?;
        }

        if self.workspace.exists(LABEL_COLUMN_FILE) {
            let selection: LabelSelection = self.workspace.read_json(LABEL_COLUMN_FILE)?;
            if columns.contains(&selection.label_column) {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "'{}' is the label column and cannot be dropped",
                    selection.label_column
                ))
                .into());
            }
        }

        let remaining = dataset.drop_many(columns.iter().map(String::as_str));
        let label_kept = usize::from(self.workspace.exists(LABEL_COLUMN_FILE));
        if remaining.width() <= label_kept {
            return Err(PipelineError::InvalidConfiguration("dropping these columns leaves no features".into()).into());
        }

        let _lock = self.workspace.lock()?;
        write_dataset(&self.workspace.dataset_path(), &remaining)?;
        if self.workspace.exists(COLUMN_TYPES_FILE) {
            let mut dtypes: BTreeMap<String, String> = self.workspace.read_json(COLUMN_TYPES_FILE)?;
            dtypes.retain(|c, _| !columns.contains(c));
            self.workspace.write_json(COLUMN_TYPES_FILE, &dtypes)?;
        }

        tracing::info!("Dropped {:?}; {} columns remain", columns, remaining.width());
        Ok(column_names(&remaining))
    }

    // ─── Read-only views ──────────────────────────────────────────────────────

    pub fn summary(&self) -> Result<DataSummary> {
        Ok(profile::summarize(&self.uploaded()?))
    }

    pub fn value_counts(&self, column: &str) -> Result<ValueCounts> {
        Ok(profile::value_counts(&self.uploaded()?, column)?)
    }

    // ─── Model configuration ──────────────────────────────────────────────────

    /// Structural checks always; shape checks when processing has already run
    pub fn save_model(&self, config: &NetworkConfig) -> Result<()> {
        config.validate()?;
        if self.workspace.exists(NETWORK_PARAMETERS_FILE) {
            let params: NetworkParameters = self.workspace.read_json(NETWORK_PARAMETERS_FILE)?;
            config.check_against(&params)?;
        }
        self.workspace.write_json(MODEL_CONFIG_FILE, config)?;
        tracing::info!("Saved model config: {} layers, input_size={}", config.layers.len(), config.input_size);
        Ok(())
    }
}
