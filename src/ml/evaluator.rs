// ============================================================
// Layer 5 - Evaluator
// ============================================================
// Scores a model on one partition in inference mode.
//
// Callers pass the result of model.valid(): the inner backend
// has no autodiff graph and dropout is inactive.
//
// Predictions:
//   sigmoid output → sigmoid(logit) rounded half-to-even → 0 / 1
//   k-unit output  → argmax over the logits
//
// The confusion matrix is only built on request. If it cannot
// be built, the error is written into the report and the other
// metrics are still returned.

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::data::batcher::{TabularBatch, TabularBatcher};
use crate::data::dataset::TabularDataset;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::events::EvaluationReport;
use crate::ml::metrics;
use crate::ml::network::Network;

pub struct Evaluator<B: Backend> {
    loader:      Arc<dyn DataLoader<TabularBatch<B>>>,
    num_classes: usize,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(dataset: TabularDataset, batch_size: usize, device: B::Device) -> Self {
        let num_classes = dataset.num_classes();
        let loader = DataLoaderBuilder::new(TabularBatcher::<B>::new(device))
            .batch_size(batch_size)
            .num_workers(1)
            .build(dataset);
        Self { loader, num_classes }
    }

    pub fn num_items(&self) -> usize {
        self.loader.num_items()
    }

    pub fn evaluate(&self, model: &Network<B>, with_confusion: bool) -> PipelineResult<EvaluationReport> {
        let mut loss_sum = 0.0f64;
        let mut truth: Vec<usize> = Vec::with_capacity(self.num_items());
        let mut pred: Vec<usize> = Vec::with_capacity(self.num_items());

        for batch in self.loader.iter() {
            let rows = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.inputs, batch.targets.clone());
            loss_sum += loss.into_scalar().elem::<f64>() * rows as f64;

            truth.extend(int_values(batch.targets)?);
            pred.extend(predict(model, logits)?);
        }

        let loss = if truth.is_empty() { 0.0 } else { loss_sum / truth.len() as f64 };
        let (precision, recall) = metrics::macro_precision_recall(&truth, &pred, self.num_classes);
        let mut report = EvaluationReport {
            loss,
            accuracy: metrics::accuracy(&truth, &pred),
            precision,
            recall,
            ..EvaluationReport::default()
        };

        if with_confusion {
            match metrics::confusion_matrix(&truth, &pred, self.num_classes) {
                Ok(matrix) => report.confusion_matrix = Some(matrix),
                Err(e) => {
                    tracing::warn!("Confusion matrix skipped: {}", e);
                    report.confusion_matrix_error = Some(e.to_string());
                }
            }
        }
        Ok(report)
    }
}

/// Class predictions for a batch of logits
pub fn predict<B: Backend>(model: &Network<B>, logits: Tensor<B, 2>) -> PipelineResult<Vec<usize>> {
    if model.sigmoid_output {
        let probs = sigmoid(logits)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| PipelineError::TrainingFailure(format!("reading probabilities: {e:?}")))?;
        Ok(probs.iter().map(|p| p.round_ties_even() as usize).collect())
    } else {
        int_values(logits.argmax(1).flatten::<1>(0, 1))
    }
}

fn int_values<B: Backend>(tensor: Tensor<B, 1, Int>) -> PipelineResult<Vec<usize>> {
    let values = tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| PipelineError::TrainingFailure(format!("reading class indices: {e:?}")))?;
    Ok(values.into_iter().map(|v| v.max(0) as usize).collect())
}
