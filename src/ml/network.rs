// ============================================================
// Layer 5 - Network Builder
// ============================================================
// Folds a NetworkConfig into a Burn module, carrying the running
// input width from one dense layer to the next:
//
//   input_size=4, [dense 8 relu, dropout 0.2, dense 3 softmax]
//
//     Stage { Linear 4→8, Relu }
//     Stage { Dropout 0.2 }
//     Stage { Linear 8→3 }            ← logits, width 3
//
// Activations:
//   relu     → Relu appended after the dense layer
//   sigmoid  → only meaningful on the last layer; the layer is
//              forced to one unit and trained on logits
//   softmax / linear → nothing appended (cross-entropy takes logits)
//
// Loss selection follows the output width:
//   1 unit  → binary cross-entropy (logits form)
//   k units → categorical cross-entropy over class indices

use burn::{
    nn::{
        loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    prelude::*,
};

use crate::domain::error::PipelineResult;
use crate::domain::network_config::{Activation, LayerSpec, NetworkConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    BinaryCrossEntropy,
    CrossEntropy,
}

/// One entry of the layer list
#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    pub dense:   Option<Linear<B>>,
    pub relu:    Option<Relu>,
    pub dropout: Option<Dropout>,
}

impl<B: Backend> Stage<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = match &self.dense {
            Some(linear) => linear.forward(x),
            None => x,
        };
        let x = match &self.relu {
            Some(relu) => relu.forward(x),
            None => x,
        };
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        }
    }
}

#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    pub stages:         Vec<Stage<B>>,
    pub sigmoid_output: bool,
    pub output_width:   usize,
}

impl<B: Backend> Network<B> {
    /// x: [batch, input_size] → logits: [batch, output_width]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.stages.iter().fold(x, |x, stage| stage.forward(x))
    }

    pub fn loss_kind(&self) -> LossKind {
        if self.output_width == 1 {
            LossKind::BinaryCrossEntropy
        } else {
            LossKind::CrossEntropy
        }
    }

    /// Mean loss of a batch; targets are class indices [batch]
    pub fn loss(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let device = logits.device();
        match self.loss_kind() {
            LossKind::BinaryCrossEntropy => {
                let [batch, _] = logits.dims();
                BinaryCrossEntropyLossConfig::new()
                    .with_logits(true)
                    .init(&device)
                    .forward(logits.reshape([batch]), targets)
            }
            LossKind::CrossEntropy => CrossEntropyLossConfig::new()
                .init(&device)
                .forward(logits, targets),
        }
    }

    pub fn forward_loss(&self, x: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(x);
        (self.loss(logits.clone(), targets), logits)
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

pub struct NetworkBuilder<'a> {
    config: &'a NetworkConfig,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a NetworkConfig) -> Self {
        Self { config }
    }

    pub fn build<B: Backend>(&self, device: &B::Device) -> PipelineResult<Network<B>> {
        self.config.validate()?;
        let sigmoid_output = self.config.has_sigmoid_output();
        let last = self.config.layers.len() - 1;

        let mut stages = Vec::with_capacity(self.config.layers.len());
        let mut width = self.config.input_size;
        for (i, layer) in self.config.layers.iter().enumerate() {
            match layer {
                LayerSpec::Dense { nodes, activation } => {
                    let out = if i == last && sigmoid_output { 1 } else { *nodes };
                    stages.push(Stage {
                        dense:   Some(LinearConfig::new(width, out).init(device)),
                        relu:    (*activation == Activation::Relu).then(Relu::new),
                        dropout: None,
                    });
                    width = out;
                }
                LayerSpec::Dropout { rate } => stages.push(Stage {
                    dense:   None,
                    relu:    None,
                    dropout: Some(DropoutConfig::new(*rate).init()),
                }),
            }
        }

        tracing::info!(
            "Network built: {} stages, {} → {} ({})",
            stages.len(),
            self.config.input_size,
            width,
            if sigmoid_output { "sigmoid output" } else { "logits output" }
        );
        Ok(Network { stages, sigmoid_output, output_width: width })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn config(json: &str) -> NetworkConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_multiclass_network_shapes() {
        let cfg = config(
            r#"{"input_size": 4, "layers": [
                {"type": "dense",   "settings": {"nodes": 8, "activation": "relu"}},
                {"type": "dropout", "settings": {"rate": 0.2}},
                {"type": "dense",   "settings": {"nodes": 3, "activation": "softmax"}}
            ]}"#,
        );
        let device = Default::default();
        let net: Network<TestBackend> = NetworkBuilder::new(&cfg).build(&device).unwrap();

        assert_eq!(net.stages.len(), 3);
        assert!(net.stages[0].relu.is_some());
        assert!(net.stages[1].dropout.is_some());
        assert!(net.stages[2].relu.is_none());
        assert_eq!(net.loss_kind(), LossKind::CrossEntropy);

        let x = Tensor::<TestBackend, 2>::zeros([5, 4], &device);
        assert_eq!(net.forward(x).dims(), [5, 3]);
    }

    #[test]
    fn test_sigmoid_output_forced_to_one_unit() {
        let cfg = config(
            r#"{"input_size": 2, "layers": [
                {"type": "dense", "settings": {"nodes": 4, "activation": "relu"}},
                {"type": "dense", "settings": {"nodes": 2, "activation": "sigmoid"}}
            ]}"#,
        );
        let device = Default::default();
        let net: Network<TestBackend> = NetworkBuilder::new(&cfg).build(&device).unwrap();
        assert!(net.sigmoid_output);
        assert_eq!(net.output_width, 1);
        assert_eq!(net.loss_kind(), LossKind::BinaryCrossEntropy);

        let x = Tensor::<TestBackend, 2>::ones([3, 2], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1].as_slice(), &device);
        let (loss, logits) = net.forward_loss(x, targets);
        assert_eq!(logits.dims(), [3, 1]);
        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_invalid_config_rejected_before_building() {
        let cfg = config(r#"{"input_size": 2, "layers": [{"type": "dropout", "settings": {"rate": 0.5}}]}"#);
        let device = Default::default();
        assert!(NetworkBuilder::new(&cfg).build::<TestBackend>(&device).is_err());
    }
}
