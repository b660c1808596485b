// ============================================================
// Layer 3 - Training Run Lifecycle
// ============================================================
//   idle ──start──▶ running ──complete──▶ completed
//                      │
//                      └────fail────────▶ failed
//
// A run is mutated once per epoch and finalised by the test pass.
// It is not persisted; only the emitted events outlive it.

use serde::Serialize;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::events::EvaluationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochRecord {
    pub epoch:         usize,
    pub train_loss:    f64,
    pub learning_rate: f64,
    pub validation:    EvaluationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingRun {
    epochs:  usize,
    state:   RunState,
    history: Vec<EpochRecord>,
    test:    Option<EvaluationReport>,
    failure: Option<String>,
}

impl TrainingRun {
    pub fn new(epochs: usize) -> Self {
        Self { epochs, state: RunState::Idle, history: Vec::new(), test: None, failure: None }
    }

    pub fn state(&self) -> RunState { self.state }

    pub fn history(&self) -> &[EpochRecord] { &self.history }

    pub fn test_report(&self) -> Option<&EvaluationReport> { self.test.as_ref() }

    pub fn failure(&self) -> Option<&str> { self.failure.as_deref() }

    pub fn start(&mut self) -> PipelineResult<()> {
        if self.state != RunState::Idle {
            return Err(transition_error(self.state, "start"));
        }
        if self.epochs == 0 {
            return Err(PipelineError::InvalidConfiguration("epochs must be at least 1".into()));
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Epochs must arrive in order, 1..=epochs
    pub fn record_epoch(&mut self, record: EpochRecord) -> PipelineResult<()> {
        if self.state != RunState::Running {
            return Err(transition_error(self.state, "record an epoch"));
        }
        let expected = self.history.len() + 1;
        if record.epoch != expected || record.epoch > self.epochs {
            return Err(PipelineError::TrainingFailure(format!(
                "epoch {} recorded out of order (expected {expected} of {})",
                record.epoch, self.epochs
            )));
        }
        self.history.push(record);
        Ok(())
    }

    pub fn complete(&mut self, test: EvaluationReport) -> PipelineResult<()> {
        if self.state != RunState::Running {
            return Err(transition_error(self.state, "complete"));
        }
        self.test  = Some(test);
        self.state = RunState::Completed;
        Ok(())
    }

    /// Terminal; a failed run keeps its history but no test report
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state   = RunState::Failed;
        self.failure = Some(reason.into());
        self.test    = None;
    }
}

fn transition_error(state: RunState, action: &str) -> PipelineError {
    PipelineError::TrainingFailure(format!("cannot {action} a run in state {state:?}"))
}
