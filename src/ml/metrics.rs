// ============================================================
// Layer 5 - Classification Metrics
// ============================================================
// Pure functions over (true class, predicted class) pairs.
//
//   accuracy  = correct / total
//   precision = mean over ALL classes of tp / (tp + fp)
//   recall    = mean over ALL classes of tp / (tp + fn)
//
// A class with no predicted (or no true) members contributes 0
// to the macro average instead of producing NaN.

use crate::domain::error::{PipelineError, PipelineResult};

pub fn accuracy(truth: &[usize], pred: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(pred).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// (macro precision, macro recall) over `num_classes` classes
pub fn macro_precision_recall(truth: &[usize], pred: &[usize], num_classes: usize) -> (f64, f64) {
    if num_classes == 0 {
        return (0.0, 0.0);
    }
    let mut tp = vec![0usize; num_classes];
    let mut predicted = vec![0usize; num_classes];
    let mut actual = vec![0usize; num_classes];

    for (&t, &p) in truth.iter().zip(pred) {
        if p < num_classes {
            predicted[p] += 1;
        }
        if t < num_classes {
            actual[t] += 1;
            if t == p {
                tp[t] += 1;
            }
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = (0..num_classes).map(|c| ratio(tp[c], predicted[c])).sum::<f64>() / num_classes as f64;
    let recall = (0..num_classes).map(|c| ratio(tp[c], actual[c])).sum::<f64>() / num_classes as f64;
    (precision, recall)
}

/// Rows are true classes, columns predicted classes
pub fn confusion_matrix(truth: &[usize], pred: &[usize], num_classes: usize) -> PipelineResult<Vec<Vec<u64>>> {
    if truth.len() != pred.len() {
        return Err(PipelineError::ConfusionMatrix(format!(
            "{} true labels but {} predictions",
            truth.len(),
            pred.len()
        )));
    }
    let mut matrix = vec![vec![0u64; num_classes]; num_classes];
    for (&t, &p) in truth.iter().zip(pred) {
        if t >= num_classes || p >= num_classes {
            return Err(PipelineError::ConfusionMatrix(format!(
                "class pair ({t}, {p}) is outside a {num_classes}x{num_classes} matrix"
            )));
        }
        matrix[t][p] += 1;
    }
    Ok(matrix)
}
