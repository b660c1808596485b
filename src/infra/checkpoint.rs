// ============================================================
// Layer 6 - Model Checkpoint
// ============================================================
// Saves the artifacts of a completed training run:
//
//   workspace/model.mpk          ← weights, Burn's NamedMpkFileRecorder
//                                  at full precision
//   workspace/train_config.json  ← hyperparameters of the same run
//
// Only completed runs reach save_model(); a failed or cancelled
// run leaves the previous weights and their config untouched.
//
// Loading needs the same NetworkConfig the weights were trained
// with, so the model is rebuilt first and the record applied on
// top of it.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::Serialize;
use std::path::PathBuf;

use crate::infra::artifacts::{Workspace, MODEL_WEIGHTS_STEM, TRAIN_CONFIG_FILE};
use crate::ml::network::Network;

type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

pub struct ModelCheckpoint {
    workspace: Workspace,
    /// Path without extension; the recorder appends it
    path:      PathBuf,
}

impl ModelCheckpoint {
    pub fn new(workspace: &Workspace) -> Self {
        Self { workspace: workspace.clone(), path: workspace.path(MODEL_WEIGHTS_STEM) }
    }

    /// Weights first, then the config that produced them
    pub fn save_model<B: Backend, C: Serialize>(&self, model: &Network<B>, config: &C) -> Result<()> {
        WeightsRecorder::new()
            .record(model.clone().into_record(), self.path.clone())
            .with_context(|| format!("Failed to save model weights to '{}'", self.path.display()))?;
        self.workspace
            .write_json(TRAIN_CONFIG_FILE, config)
            .context("Failed to save the training config")?;

        tracing::info!("Saved model weights to '{}'", self.path.display());
        Ok(())
    }

    /// `model` must have the architecture the weights were saved from
    #[cfg(test)]
    pub fn load_model<B: Backend>(&self, model: Network<B>, device: &B::Device) -> Result<Network<B>> {
        let record = WeightsRecorder::new()
            .load(self.path.clone(), device)
            .with_context(|| {
                format!("Cannot load model weights '{}'. Has a training run completed?", self.path.display())
            })?;
        Ok(model.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network_config::NetworkConfig;
    use crate::ml::network::NetworkBuilder;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_saved_weights_reload_into_same_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let cfg: NetworkConfig = serde_json::from_str(
            r#"{"input_size": 3, "layers": [{"type": "dense", "settings": {"nodes": 2, "activation": "softmax"}}]}"#,
        )
        .unwrap();
        let device = Default::default();

        let trained: Network<TestBackend> = NetworkBuilder::new(&cfg).build(&device).unwrap();
        let ckpt = ModelCheckpoint::new(&ws);
        ckpt.save_model(&trained, &serde_json::json!({"epochs": 1})).unwrap();
        assert!(dir.path().join("model.mpk").exists());
        assert!(dir.path().join("train_config.json").exists());

        let fresh: Network<TestBackend> = NetworkBuilder::new(&cfg).build(&device).unwrap();
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let x = Tensor::<TestBackend, 2>::ones([1, 3], &device);
        let a: Vec<f32> = trained.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.forward(x).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_loading_without_saved_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let cfg: NetworkConfig = serde_json::from_str(
            r#"{"input_size": 1, "layers": [{"type": "dense", "settings": {"nodes": 2}}]}"#,
        )
        .unwrap();
        let device = Default::default();
        let model: Network<TestBackend> = NetworkBuilder::new(&cfg).build(&device).unwrap();
        assert!(ModelCheckpoint::new(&ws).load_model(model, &device).is_err());
    }
}
