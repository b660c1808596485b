// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a training run over a processed workspace:
//
//   Step 1: Validate the hyperparameters
//   Step 2: Load network_parameters.json + model_config.json
//           and check the config fits the processed data
//   Step 3: Claim the workspace (run lock)
//   Step 4: Build Burn datasets from processed_*.csv and
//           processed_y_*.csv
//   Step 5: Spawn the training loop on a blocking thread; events
//           come back over a channel, cancellation goes in via
//           a CancellationToken
//
// Steps 1-4 happen in prepare(), before any computation, so a
// bad request is rejected without starting a run. train_config.json
// is written by the checkpoint together with the weights, so it
// always describes the last completed run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::data::{dataset::TabularDataset, loader::read_dataset};
use crate::domain::dataset::{Partition, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::network_config::{NetworkConfig, NetworkParameters};
use crate::domain::run::TrainingRun;
use crate::infra::{
    artifacts::{RunLock, Workspace, HISTORY_FILE, MODEL_CONFIG_FILE, NETWORK_PARAMETERS_FILE},
    checkpoint::ModelCheckpoint,
    metrics::HistoryLogger,
    progress::{EventReceiver, ProgressPublisher},
};
use crate::ml::trainer::{run_training, RunOutputs};

// ─── Training Configuration ──────────────────────────────────────────────────
// Hyperparameters of one run. Saved next to the artifacts so a
// finished run can be traced back to its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs:     usize,
    pub batch_size: usize,
    pub lr:         f64,
    /// Epochs between learning-rate drops
    pub lr_step:    usize,
    /// Factor applied at every drop
    pub lr_decay:   f64,
    pub seed:       u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs:     10,
            batch_size: 32,
            lr:         1e-3,
            lr_step:    10,
            lr_decay:   0.1,
            seed:       42,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        let problem = if self.epochs == 0 {
            Some("epochs must be at least 1".to_string())
        } else if self.batch_size == 0 {
            Some("batch_size must be at least 1".to_string())
        } else if !(self.lr > 0.0 && self.lr.is_finite()) {
            Some(format!("learning rate must be positive, got {}", self.lr))
        } else if self.lr_step == 0 {
            Some("lr_step must be at least 1".to_string())
        } else if !(self.lr_decay > 0.0 && self.lr_decay <= 1.0) {
            Some(format!("lr_decay must be in (0, 1], got {}", self.lr_decay))
        } else {
            None
        };
        match problem {
            Some(msg) => Err(PipelineError::InvalidConfiguration(msg)),
            None => Ok(()),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    workspace: Workspace,
    config:    TrainConfig,
}

impl TrainUseCase {
    pub fn new(workspace: Workspace, config: TrainConfig) -> Self {
        Self { workspace, config }
    }

    /// Everything that can be checked before training starts
    pub fn prepare(&self) -> Result<TrainingJob> {
        let ws = &self.workspace;

        // ── Step 1: hyperparameters ───────────────────────────────────────────
        self.config.validate()?;

        // ── Step 2: model config vs processed shape ───────────────────────────
        let params: NetworkParameters =
            ws.read_json(NETWORK_PARAMETERS_FILE).context("Process the dataset before training")?;
        let network: NetworkConfig = ws.read_json(MODEL_CONFIG_FILE).context("Save a model config before training")?;
        network.check_against(&params)?;

        // ── Step 3: lock ──────────────────────────────────────────────────────
        let lock = ws.lock()?;

        // ── Step 4: datasets ──────────────────────────────────────────────────
        let data = Partition::ALL
            .iter()
            .map(|&p| self.load_partition(p, &params))
            .collect::<Result<Vec<_>>>()?;
        let [train, validation, test]: [TabularDataset; 3] = data
            .try_into()
            .map_err(|_| anyhow::anyhow!("expected exactly three partitions"))?;

        tracing::info!(
            "Training prepared: {} train / {} val / {} test rows, {} epochs",
            burn::data::dataset::Dataset::len(&train),
            burn::data::dataset::Dataset::len(&validation),
            burn::data::dataset::Dataset::len(&test),
            self.config.epochs
        );

        Ok(TrainingJob {
            config:     self.config.clone(),
            network,
            data:       Partitions::new(train, validation, test),
            history:    HistoryLogger::new(ws.path(HISTORY_FILE))?,
            checkpoint: ModelCheckpoint::new(ws),
            lock,
        })
    }

    fn load_partition(&self, partition: Partition, params: &NetworkParameters) -> Result<TabularDataset> {
        let features = read_dataset(&self.workspace.processed_features_path(partition))?;
        let labels = read_dataset(&self.workspace.processed_labels_path(partition))?;
        if features.width() != params.num_cols || labels.width() != params.num_label_classes {
            return Err(PipelineError::SchemaMismatch(format!(
                "processed {partition} files have {} features / {} classes, network_parameters.json says {} / {}",
                features.width(),
                labels.width(),
                params.num_cols,
                params.num_label_classes
            ))
            .into());
        }
        Ok(TabularDataset::from_processed(&features, &labels)?)
    }
}

// ─── TrainingJob ──────────────────────────────────────────────────────────────

/// A validated run holding the workspace lock until it finishes
pub struct TrainingJob {
    config:     TrainConfig,
    network:    NetworkConfig,
    data:       Partitions<TabularDataset>,
    history:    HistoryLogger,
    checkpoint: ModelCheckpoint,
    lock:       RunLock,
}

/// Listener side of a running job
pub struct TrainingHandle {
    pub events: EventReceiver,
    pub cancel: CancellationToken,
    pub task:   JoinHandle<TrainingRun>,
}

impl TrainingJob {
    /// Must be called inside a tokio runtime
    pub fn spawn(self) -> TrainingHandle {
        self.spawn_with(CancellationToken::new())
    }

    /// Spawn with a token the caller already holds
    pub fn spawn_with(self, cancel: CancellationToken) -> TrainingHandle {
        let (mut publisher, events) = ProgressPublisher::channel();
        let token = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            let TrainingJob { config, network, data, history, checkpoint, lock } = self;
            tracing::info!("Training run {} started", lock.run_id());
            let outputs = RunOutputs { history: Some(&history), checkpoint: Some(&checkpoint) };
            let run = run_training(&config, &network, data, outputs, &mut publisher, &token);
            tracing::info!("Training run {} finished: {:?}", lock.run_id(), run.state());
            drop(lock);
            run
        });

        TrainingHandle { events, cancel, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::write_dataset;
    use crate::data::loader::tests::dataset;
    use crate::infra::artifacts::TRAIN_CONFIG_FILE;
    use crate::domain::events::TrainingEvent;
    use crate::domain::run::RunState;
    use crate::infra::metrics::HistoryRow;

    /// Processed workspace: feature x decides the class
    fn processed_workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        for (partition, n) in [(Partition::Train, 24), (Partition::Validation, 6), (Partition::Test, 6)] {
            let xs: Vec<[String; 2]> = (0..n)
                .map(|i| [if i % 2 == 0 { "-1.5" } else { "1.5" }.to_string(), "0.5".to_string()])
                .collect();
            let ys: Vec<[&str; 2]> = (0..n).map(|i| if i % 2 == 0 { ["1", "0"] } else { ["0", "1"] }).collect();
            let x_rows: Vec<Vec<&str>> = xs.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
            let x_refs: Vec<&[&str]> = x_rows.iter().map(Vec::as_slice).collect();
            let y_refs: Vec<&[&str]> = ys.iter().map(|r| r.as_slice()).collect();
            write_dataset(&ws.processed_features_path(partition), &dataset(&["a", "b"], &x_refs)).unwrap();
            write_dataset(&ws.processed_labels_path(partition), &dataset(&["0", "1"], &y_refs)).unwrap();
        }
        ws.write_json(NETWORK_PARAMETERS_FILE, &NetworkParameters { num_cols: 2, num_label_classes: 2 }).unwrap();
        let network: NetworkConfig = serde_json::from_str(
            r#"{"input_size": 2, "layers": [
                {"type": "dense", "settings": {"nodes": 6, "activation": "relu"}},
                {"type": "dense", "settings": {"nodes": 2, "activation": "softmax"}}
            ]}"#,
        )
        .unwrap();
        ws.write_json(MODEL_CONFIG_FILE, &network).unwrap();
        (dir, ws)
    }

    #[tokio::test]
    async fn test_spawned_job_streams_events_and_saves_artifacts() {
        let (dir, ws) = processed_workspace();
        let config = TrainConfig { epochs: 3, batch_size: 8, lr: 1e-2, ..TrainConfig::default() };
        let job = TrainUseCase::new(ws.clone(), config).prepare().unwrap();

        // the job holds the workspace while it is alive
        assert!(matches!(ws.lock(), Err(PipelineError::RunInProgress { .. })));

        let mut handle = job.spawn();
        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }
        let run = handle.task.await.unwrap();

        assert_eq!(run.state(), RunState::Completed);
        assert_eq!(events.len(), 4);
        assert!(matches!(events.last(), Some(TrainingEvent::Completed(_))));

        let rows = HistoryLogger::new(ws.path(HISTORY_FILE)).unwrap().read_all().unwrap();
        let epochs: Vec<usize> = rows.iter().map(|r: &HistoryRow| r.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);
        assert!(dir.path().join("model.mpk").exists());
        assert!(dir.path().join(TRAIN_CONFIG_FILE).exists());
        assert!(ws.lock().is_ok());
    }

    async fn run_to_end(job: TrainingJob, cancel: CancellationToken) -> TrainingRun {
        let mut handle = job.spawn_with(cancel);
        while handle.events.recv().await.is_some() {}
        handle.task.await.unwrap()
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_previous_config_and_weights() {
        let (dir, ws) = processed_workspace();
        let first = TrainConfig { epochs: 3, batch_size: 8, lr: 1e-2, ..TrainConfig::default() };
        let job = TrainUseCase::new(ws.clone(), first.clone()).prepare().unwrap();
        assert_eq!(run_to_end(job, CancellationToken::new()).await.state(), RunState::Completed);
        let weights = std::fs::read(dir.path().join("model.mpk")).unwrap();

        let second = TrainConfig { epochs: 7, lr: 0.5, ..first.clone() };
        let job = TrainUseCase::new(ws.clone(), second).prepare().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(run_to_end(job, cancel).await.state(), RunState::Failed);

        let saved: TrainConfig = ws.read_json(TRAIN_CONFIG_FILE).unwrap();
        assert_eq!(saved, first);
        assert_eq!(std::fs::read(dir.path().join("model.mpk")).unwrap(), weights);
    }

    #[test]
    fn test_prepare_writes_no_config() {
        let (dir, ws) = processed_workspace();
        let _job = TrainUseCase::new(ws, TrainConfig::default()).prepare().unwrap();
        assert!(!dir.path().join(TRAIN_CONFIG_FILE).exists());
    }

    #[test]
    fn test_mismatched_config_rejected_before_lock() {
        let (_dir, ws) = processed_workspace();
        let bad: NetworkConfig = serde_json::from_str(
            r#"{"input_size": 3, "layers": [{"type": "dense", "settings": {"nodes": 2, "activation": "softmax"}}]}"#,
        )
        .unwrap();
        ws.write_json(MODEL_CONFIG_FILE, &bad).unwrap();

        let err = TrainUseCase::new(ws.clone(), TrainConfig::default()).prepare().err().unwrap();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::InvalidConfiguration(_))));
        assert!(ws.lock().is_ok());
    }

    #[test]
    fn test_missing_processed_data_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let err = TrainUseCase::new(ws, TrainConfig::default()).prepare().err().unwrap();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::MissingInput(_))));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        assert!(TrainConfig { epochs: 0, ..Default::default() }.validate().is_err());
        assert!(TrainConfig { lr_decay: 1.5, ..Default::default() }.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }
}
