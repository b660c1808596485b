// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Mini-batch training of a Network built from the saved config,
// with per-epoch validation and a final test pass.
//
//   for epoch in 1..=epochs:
//       cancelled?            → stop, report Cancelled
//       lr = step_decay(epoch)
//       shuffle + batch train → forward / backward / Adam step
//       evaluate validation   → history row + progress event
//   evaluate test (with confusion matrix)
//   save weights + config     → completed event
//
// Any error inside the loop ends the run with one error event
// and nothing is saved.
//
// Backends:
//   - training uses TrainBackend (Autodiff<NdArray>)
//   - model.valid() returns the model on EvalBackend (NdArray),
//     so evaluation builds no autodiff graph and dropout is off

use burn::{
    backend::ndarray::NdArrayDevice,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset as _},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use tokio_util::sync::CancellationToken;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TabularBatcher, dataset::TabularDataset};
use crate::domain::dataset::Partitions;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::events::{progress_percent, EvaluationReport, TrainingEvent};
use crate::domain::network_config::NetworkConfig;
use crate::domain::run::{EpochRecord, TrainingRun};
use crate::domain::traits::ProgressSink;
use crate::infra::{checkpoint::ModelCheckpoint, metrics::HistoryLogger};
use crate::ml::evaluator::Evaluator;
use crate::ml::network::{Network, NetworkBuilder};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend  = burn::backend::NdArray;

/// Where a run leaves its traces besides the event stream
#[derive(Default)]
pub struct RunOutputs<'a> {
    pub history:    Option<&'a HistoryLogger>,
    pub checkpoint: Option<&'a ModelCheckpoint>,
}

/// lr = base * decay ^ floor((epoch - 1) / step)
pub fn step_decay_lr(cfg: &TrainConfig, epoch: usize) -> f64 {
    let drops = (epoch.saturating_sub(1) / cfg.lr_step.max(1)) as i32;
    cfg.lr * cfg.lr_decay.powi(drops)
}

/// Run one training job to its end. Always publishes exactly one
/// terminal event and returns the finished run.
pub fn run_training(
    cfg:     &TrainConfig,
    network: &NetworkConfig,
    data:    Partitions<TabularDataset>,
    outputs: RunOutputs<'_>,
    sink:    &mut dyn ProgressSink,
    cancel:  &CancellationToken,
) -> TrainingRun {
    let mut run = TrainingRun::new(cfg.epochs);

    let result = run
        .start()
        .and_then(|_| train_loop(cfg, network, data, &outputs, sink, cancel, &mut run));

    let outcome = result.and_then(|report| run.complete(report.clone()).map(|_| report));
    match outcome {
        Ok(report) => {
            tracing::info!(
                "Training complete: test accuracy={:.4}, precision={:.4}, recall={:.4}",
                report.accuracy, report.precision, report.recall
            );
            sink.publish(TrainingEvent::Completed(report));
        }
        Err(e) => {
            tracing::error!("Training failed: {}", e);
            run.fail(e.to_string());
            sink.publish(TrainingEvent::Error { error: e.to_string() });
        }
    }
    run
}

fn train_loop(
    cfg:     &TrainConfig,
    network: &NetworkConfig,
    data:    Partitions<TabularDataset>,
    outputs: &RunOutputs<'_>,
    sink:    &mut dyn ProgressSink,
    cancel:  &CancellationToken,
    run:     &mut TrainingRun,
) -> PipelineResult<EvaluationReport> {
    let device = NdArrayDevice::default();
    TrainBackend::seed(cfg.seed);

    if data.train.is_empty() {
        return Err(PipelineError::TrainingFailure("the training partition is empty".into()));
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Network<TrainBackend> = NetworkBuilder::new(network).build(&device)?;
    let mut optim = AdamConfig::new().init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TabularBatcher::<TrainBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(data.train);
    let validator = Evaluator::<EvalBackend>::new(data.validation, cfg.batch_size, device.clone());
    let tester    = Evaluator::<EvalBackend>::new(data.test, cfg.batch_size, device);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { completed_epochs: epoch - 1 });
        }
        let lr = step_decay_lr(cfg, epoch);

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch.inputs, batch.targets);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(PipelineError::TrainingFailure(format!(
                    "loss became {loss_val} in epoch {epoch}"
                )));
            }
            loss_sum += loss_val;
            batches  += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }
        let train_loss = loss_sum / batches.max(1) as f64;

        let validation = validator.evaluate(&model.valid(), false)?;
        let record = EpochRecord { epoch, train_loss, learning_rate: lr, validation };

        if let Some(history) = outputs.history {
            history.log(&record)?;
        }
        sink.publish(TrainingEvent::Progress {
            epoch,
            progress: progress_percent(epoch, cfg.epochs),
            metrics:  record.validation.metrics(),
        });
        tracing::info!(
            "Epoch {:>3}/{} | lr={:.2e} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
            epoch, cfg.epochs, lr, train_loss, record.validation.loss, record.validation.accuracy * 100.0,
        );
        run.record_epoch(record)?;
    }

    // ── Final test pass ───────────────────────────────────────────────────────
    let report = tester.evaluate(&model.valid(), true)?;

    if let Some(checkpoint) = outputs.checkpoint {
        checkpoint
            .save_model(&model, cfg)
            .map_err(|e| PipelineError::TrainingFailure(format!("{e:#}")))?;
    }
    Ok(report)
}
