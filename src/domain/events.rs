// ============================================================
// Layer 3 - Training Events and Metrics
// ============================================================
// Payloads pushed from a training run to its listener:
//
//   progress  {"event":"progress","epoch":3,"progress":30.0,
//              "metrics":{"accuracy":..,"precision":..,"recall":..}}
//   completed {"event":"completed","loss":..,"accuracy":..,
//              "precision":..,"recall":..,"confusion_matrix":[[..]]}
//   error     {"event":"error","error":"..."}

use serde::{Deserialize, Serialize};

/// Validation metrics reported after each epoch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
}

/// Everything one Evaluator pass produces
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub loss:      f64,
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusion_matrix: Option<Vec<Vec<u64>>>,
    /// Set when the confusion matrix was requested but could not be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusion_matrix_error: Option<String>,
}

impl EvaluationReport {
    pub fn metrics(&self) -> EpochMetrics {
        EpochMetrics {
            accuracy:  self.accuracy,
            precision: self.precision,
            recall:    self.recall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainingEvent {
    Progress {
        epoch:    usize,
        progress: f64,
        metrics:  EpochMetrics,
    },
    Completed(EvaluationReport),
    Error {
        error: String,
    },
}

impl TrainingEvent {
    /// `completed` and `error` end a run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrainingEvent::Progress { .. })
    }
}

/// Percent complete after `epoch` of `epochs`; the final test pass owns the last slice
pub fn progress_percent(epoch: usize, epochs: usize) -> f64 {
    epoch as f64 / (epochs as f64 + 1.0) * 100.0
}
