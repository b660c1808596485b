// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand per workspace operation, in the order a session
// usually runs them:
//
//   split → select-label → (drop-columns) → summary / value-counts
//   → process → save-model → train → compare
//
// Every Args struct converts into its application config via
// From, so the use cases never see clap types.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{prepare_use_case::SplitConfig, train_use_case::TrainConfig};
use crate::domain::options::{FeatureScaling, ProcessingOptions, SplitRatios};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shuffle dataset.csv into train / val / test partitions
    Split(SplitArgs),

    /// Record the label column and the inferred column types
    SelectLabel(SelectLabelArgs),

    /// Remove columns from the uploaded dataset
    DropColumns(DropColumnsArgs),

    /// Per-column type and missing-value summary
    Summary,

    /// Frequency table of one column
    ValueCounts(ValueCountsArgs),

    /// Impute, encode and scale the partitions
    Process(ProcessArgs),

    /// Validate and store a network configuration
    SaveModel(SaveModelArgs),

    /// Train the saved network, streaming progress as JSON lines
    Train(TrainArgs),

    /// Missing values and duplicates before vs after processing
    Compare,
}

// ─── split ────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Fraction of rows for training
    #[arg(long, default_value_t = 0.7)]
    pub train_size: f64,

    /// Fraction of rows for validation; the rest is the test set
    #[arg(long, default_value_t = 0.15)]
    pub validation_size: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<SplitArgs> for SplitConfig {
    fn from(a: SplitArgs) -> Self {
        SplitConfig {
            ratios: SplitRatios { train_size: a.train_size, validation_size: a.validation_size },
            seed:   a.seed,
        }
    }
}

// ─── select-label / drop-columns / value-counts ───────────────────────────────

#[derive(Args, Debug)]
pub struct SelectLabelArgs {
    /// Column the network learns to predict
    #[arg(long = "label")]
    pub label_column: String,
}

#[derive(Args, Debug)]
pub struct DropColumnsArgs {
    /// Comma separated column names
    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ValueCountsArgs {
    #[arg(long)]
    pub column: String,
}

// ─── process ──────────────────────────────────────────────────────────────────

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ScalingArg {
    #[default]
    None,
    Standardization,
    Normalization,
}

impl From<ScalingArg> for FeatureScaling {
    fn from(s: ScalingArg) -> Self {
        match s {
            ScalingArg::None            => FeatureScaling::None,
            ScalingArg::Standardization => FeatureScaling::Standardization,
            ScalingArg::Normalization   => FeatureScaling::Normalization,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// JSON file with the options; the flags below are ignored when given
    #[arg(long)]
    pub options: Option<PathBuf>,

    #[arg(long)]
    pub remove_duplicates: bool,

    #[arg(long)]
    pub handle_missing_values: bool,

    #[arg(long)]
    pub encode_categorical: bool,

    #[arg(long, value_enum, default_value_t = ScalingArg::None)]
    pub feature_scaling: ScalingArg,
}

impl From<&ProcessArgs> for ProcessingOptions {
    fn from(a: &ProcessArgs) -> Self {
        ProcessingOptions {
            remove_duplicates:     a.remove_duplicates,
            handle_missing_values: a.handle_missing_values,
            encode_categorical:    a.encode_categorical,
            feature_scaling:       a.feature_scaling.into(),
        }
    }
}

// ─── save-model ───────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SaveModelArgs {
    /// JSON file: {"input_size": .., "layers": [..]}
    #[arg(long)]
    pub config: PathBuf,
}

// ─── train ────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of full passes through the training partition
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Starting learning rate for Adam
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// The learning rate is multiplied by --lr-decay every
    /// --lr-step epochs
    #[arg(long, default_value_t = 10)]
    pub lr_step: usize,

    #[arg(long, default_value_t = 0.1)]
    pub lr_decay: f64,

    /// Seeds weight init and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            epochs:     a.epochs,
            batch_size: a.batch_size,
            lr:         a.lr,
            lr_step:    a.lr_step,
            lr_decay:   a.lr_decay,
            seed:       a.seed,
        }
    }
}
