// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here.
//
//   network.rs   - NetworkBuilder folds the saved layer list into
//                  a Network module and picks the loss function
//                  from the output width
//
//   metrics.rs   - accuracy, macro precision / recall and the
//                  confusion matrix over class indices
//
//   evaluator.rs - inference-mode scoring of one partition
//
//   trainer.rs   - the epoch loop: Adam, step-decay learning rate,
//                  validation per epoch, final test pass, progress
//                  events, cooperative cancellation

/// Dense / dropout network assembled from a NetworkConfig
pub mod network;

/// Classification metrics
pub mod metrics;

/// Partition evaluation in inference mode
pub mod evaluator;

/// Training loop with validation and progress events
pub mod trainer;
