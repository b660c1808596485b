// ============================================================
// Layer 3 - Pipeline Errors
// ============================================================
// Every failure the core can report. Use cases wrap these in
// anyhow with file/step context; components and tests match
// on the variants directly.

use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required partition, config document or artifact is absent
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Label column absent, partitions disagree on columns, or a
    /// value does not fit its declared column type
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("schema mismatch: value '{value}' in column '{column}' is not in the pooled encoding")]
    UnseenCategory { column: String, value: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no mode available for column '{column}': every training value is missing")]
    NoModeAvailable { column: String },

    #[error("confusion matrix: {0}")]
    ConfusionMatrix(String),

    #[error("training failure: {0}")]
    TrainingFailure(String),

    #[error("training cancelled after epoch {completed_epochs}")]
    Cancelled { completed_epochs: usize },

    #[error("transformer '{0}' has already been fit in this run")]
    TransformerAlreadyFit(&'static str),

    #[error("another run ({holder}) is writing to this workspace")]
    RunInProgress { holder: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
