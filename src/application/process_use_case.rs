// ============================================================
// Layer 2 - Processing Use Case
// ============================================================
// Turns the three raw partitions into model-ready files:
//
//   Step 1: Load train / val / test + label + column types
//   Step 2: Remove cross-partition duplicates    (optional)
//   Step 3: Impute missing values                (optional, fit on train)
//   Step 4: Pop the label column
//   Step 5: Encode categorical features          (optional, pooled fit)
//   Step 6: Scale numeric features               (optional, fit on train)
//   Step 7: One-hot encode labels                (pooled fit)
//   Step 8: Write processed_*.csv, processed_y_*.csv,
//           processed_combined_y.csv, network_parameters.json
//
// Every fitted transformer lives in a ProcessingRun that belongs
// to exactly one invocation. Each slot can be filled once; a
// second fit in the same run is refused.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{
    categorical::CategoricalEncoder,
    imputer::ModeImputer,
    label_encoder::LabelEncoder,
    loader::{write_dataset, CsvPartitionLoader},
    reconciler::reconcile,
    scaler::FeatureScaler,
};
use crate::domain::dataset::{pop_column, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::network_config::NetworkParameters;
use crate::domain::options::ProcessingOptions;
use crate::domain::schema::{ColumnSchema, LabelSelection};
use crate::domain::traits::{PartitionSource, Transform};
use crate::infra::artifacts::{
    Workspace, COLUMN_TYPES_FILE, COMBINED_LABELS_FILE, LABEL_COLUMN_FILE, NETWORK_PARAMETERS_FILE,
};

// ─── ProcessingRun ────────────────────────────────────────────────────────────

/// Fitted state of one processing invocation
pub struct ProcessingRun {
    schema:  ColumnSchema,
    options: ProcessingOptions,
    imputer: Option<ModeImputer>,
    encoder: Option<CategoricalEncoder>,
    /// Outer None: not fit yet. Inner None: scaling switched off.
    scaler:  Option<Option<FeatureScaler>>,
    labels:  Option<LabelEncoder>,
}

/// Output of a processing run, before it is written anywhere
#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub features:        Partitions<DataFrame>,
    pub labels:          Partitions<DataFrame>,
    /// Raw label values, train then val then test
    pub combined_labels: Series,
    pub parameters:      NetworkParameters,
}

fn fit_once<'a, T>(
    slot: &'a mut Option<T>,
    name: &'static str,
    fit:  impl FnOnce() -> PipelineResult<T>,
) -> PipelineResult<&'a T> {
    if slot.is_some() {
        return Err(PipelineError::TransformerAlreadyFit(name));
    }
    Ok(slot.insert(fit()?))
}

impl ProcessingRun {
    pub fn new(schema: ColumnSchema, options: ProcessingOptions) -> Self {
        Self {
            schema,
            options,
            imputer: None,
            encoder: None,
            scaler: None,
            labels: None,
        }
    }

    #[cfg(test)]
    pub fn imputer(&self) -> Option<&ModeImputer> { self.imputer.as_ref() }

    pub fn process(&mut self, raw: &Partitions<DataFrame>) -> PipelineResult<ProcessedData> {
        // schema problems surface before anything is fit
        let raw = raw.aligned()?;
        self.schema.check_dataset(&raw.train)?;

        // ── Step 2: duplicates ────────────────────────────────────────────────
        let data = reconcile(&raw, self.options.remove_duplicates)?;

        // ── Step 3: imputation ────────────────────────────────────────────────
        let data = if self.options.handle_missing_values {
            let imputer = fit_once(&mut self.imputer, "mode_imputer", || ModeImputer::fit(&data.train))?;
            imputer.transform_all(&data)?.aligned()?
        } else {
            data
        };

        // ── Step 4: label pop ─────────────────────────────────────────────────
        let label_column = self.schema.label_column().to_string();
        let split = data.try_map(|_, df| pop_column(df, &label_column))?;
        let features = split.try_map(|_, (x, _)| -> PipelineResult<DataFrame> { Ok(x.clone()) })?;
        let raw_labels = split.try_map(|_, (_, y)| -> PipelineResult<Series> { Ok(y.clone()) })?;

        // ── Step 5: categorical encoding ──────────────────────────────────────
        let features = if self.options.encode_categorical {
            let schema = &self.schema;
            let encoder = fit_once(&mut self.encoder, "categorical_encoder", || {
                CategoricalEncoder::fit(&features, schema)
            })?;
            encoder.transform_all(&features)?
        } else {
            features
        };

        // ── Step 6: scaling ───────────────────────────────────────────────────
        let (schema, method) = (&self.schema, self.options.feature_scaling);
        let scaler = fit_once(&mut self.scaler, "feature_scaler", || {
            FeatureScaler::fit(&features.train, schema, method)
        })?;
        let features = match scaler {
            Some(scaler) => scaler.transform_all(&features)?,
            None => features,
        };

        // ── Step 7: labels ────────────────────────────────────────────────────
        let label_encoder = fit_once(&mut self.labels, "label_encoder", || LabelEncoder::fit(&raw_labels))?;
        let labels = label_encoder.encode(&raw_labels)?;

        let parameters = NetworkParameters {
            num_cols:          features.train.width(),
            num_label_classes: label_encoder.num_classes(),
        };
        let mut combined_labels = raw_labels.train.clone();
        combined_labels.append(&raw_labels.validation)?;
        combined_labels.append(&raw_labels.test)?;

        tracing::info!(
            "Processed: {} feature columns, {} classes, rows train={} val={} test={}",
            parameters.num_cols,
            parameters.num_label_classes,
            features.train.height(),
            features.validation.height(),
            features.test.height()
        );
        Ok(ProcessedData { features, labels, combined_labels, parameters })
    }
}

// ─── ProcessUseCase ───────────────────────────────────────────────────────────

/// Counts reported once the files are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub num_cols:          usize,
    pub num_label_classes: usize,
    pub rows:              BTreeMap<String, usize>,
}

pub struct ProcessUseCase {
    workspace: Workspace,
    options:   ProcessingOptions,
}

impl ProcessUseCase {
    pub fn new(workspace: Workspace, options: ProcessingOptions) -> Self {
        Self { workspace, options }
    }

    pub fn execute(&self) -> Result<ProcessingSummary> {
        let ws = &self.workspace;

        // ── Step 1: inputs ────────────────────────────────────────────────────
        let selection: LabelSelection = ws.read_json(LABEL_COLUMN_FILE).context("Select a label column first")?;
        let dtypes: BTreeMap<String, String> = ws.read_json(COLUMN_TYPES_FILE).context("Column types are not recorded")?;
        let schema = ColumnSchema::new(selection.label_column, dtypes)?;
        let raw = CsvPartitionLoader::new(ws.raw_partition_paths()).load_partitions()?;

        let _lock = ws.lock()?;
        tracing::info!("Processing with options {:?}", self.options);

        // ── Steps 2-7 ─────────────────────────────────────────────────────────
        let mut run = ProcessingRun::new(schema, self.options.clone());
        let processed = run.process(&raw)?;

        // ── Step 8: outputs ───────────────────────────────────────────────────
        for (partition, df) in processed.features.iter() {
            write_dataset(&ws.processed_features_path(partition), df)
                .with_context(|| format!("Cannot write processed {partition} features"))?;
        }
        for (partition, df) in processed.labels.iter() {
            write_dataset(&ws.processed_labels_path(partition), df)
                .with_context(|| format!("Cannot write processed {partition} labels"))?;
        }
        let combined = DataFrame::new(vec![Column::from(processed.combined_labels.clone())])
            .context("Cannot assemble combined labels")?;
        write_dataset(&ws.path(COMBINED_LABELS_FILE), &combined)?;
        ws.write_json(NETWORK_PARAMETERS_FILE, &processed.parameters)?;

        Ok(ProcessingSummary {
            num_cols:          processed.parameters.num_cols,
            num_label_classes: processed.parameters.num_label_classes,
            rows:              processed
                .features
                .iter()
                .map(|(p, df)| (p.tag().to_string(), df.height()))
                .collect(),
        })
    }
}
