// ============================================================
// Layer 4 - Tabular Batcher
// ============================================================
// Implements Burn's Batcher trait to stack TabularSamples into
// tensors.
//
//   Input:  Vec of N samples, each with F features
//   Output: TabularBatch { inputs [N, F], targets [N] }
//
// Features are flattened row by row and reshaped:
//   [r1_f1, r1_f2, ..., r1_fF, r2_f1, ..., rN_fF] → [N, F]

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TabularSample;

// ─── TabularBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TabularBatch<B: Backend> {
    /// Feature matrix - shape: [batch_size, num_features]
    pub inputs: Tensor<B, 2>,

    /// Class index per row - shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── TabularBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TabularBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TabularBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TabularSample, TabularBatch<B>> for TabularBatcher<B> {
    fn batch(&self, items: Vec<TabularSample>) -> TabularBatch<B> {
        let batch_size = items.len();
        let width = items.first().map(|s| s.features.len()).unwrap_or(0);

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();

        let classes: Vec<i32> = items.iter().map(|s| s.class as i32).collect();

        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, width]);
        let targets = Tensor::<B, 1, Int>::from_ints(classes.as_slice(), &self.device);

        TabularBatch { inputs, targets }
    }
}
