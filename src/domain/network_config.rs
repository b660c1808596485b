// ============================================================
// Layer 3 - Network Configuration
// ============================================================
// The declarative description of a feed-forward classifier as
// saved by the model builder:
//
//   {
//     "input_size": 12,
//     "layers": [
//       {"type": "dense",   "settings": {"nodes": 32, "activation": "relu"}},
//       {"type": "dropout", "settings": {"rate": 0.5}},
//       {"type": "dense",   "settings": {"nodes": 3,  "activation": "softmax"}}
//     ]
//   }
//
// The ml layer folds this list into a burn module; this file only
// validates it and answers shape questions about it.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Softmax,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "settings", rename_all = "lowercase")]
pub enum LayerSpec {
    Dense {
        nodes: usize,
        #[serde(default)]
        activation: Activation,
    },
    Dropout {
        rate: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub layers:     Vec<LayerSpec>,
}

/// Output of a processing run used to size the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub num_cols:          usize,
    pub num_label_classes: usize,
}

impl NetworkConfig {
    /// Structural checks that need no processed data
    pub fn validate(&self) -> PipelineResult<()> {
        if self.input_size == 0 {
            return Err(invalid("input_size must be at least 1"));
        }
        if self.layers.is_empty() {
            return Err(invalid("the layer list is empty"));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            match layer {
                LayerSpec::Dense { nodes: 0, .. } => {
                    return Err(invalid(&format!("dense layer {i} has zero nodes")));
                }
                LayerSpec::Dropout { rate } if !(0.0..1.0).contains(rate) => {
                    return Err(invalid(&format!("dropout layer {i} has rate {rate}, expected [0, 1)")));
                }
                _ => {}
            }
        }
        match self.layers.last() {
            Some(LayerSpec::Dense { nodes: 1, activation }) if *activation != Activation::Sigmoid => Err(invalid(
                "a single-unit output layer must use the sigmoid activation",
            )),
            Some(LayerSpec::Dense { .. }) => Ok(()),
            _ => Err(invalid("the last layer must be dense")),
        }
    }

    /// True when the final dense layer uses sigmoid (binary output)
    pub fn has_sigmoid_output(&self) -> bool {
        matches!(
            self.layers.last(),
            Some(LayerSpec::Dense { activation: Activation::Sigmoid, .. })
        )
    }

    /// Width of the network output. A sigmoid output is always one unit wide.
    pub fn output_width(&self) -> usize {
        match self.layers.last() {
            Some(LayerSpec::Dense { .. }) if self.has_sigmoid_output() => 1,
            Some(LayerSpec::Dense { nodes, .. }) => *nodes,
            _ => 0,
        }
    }

    /// Cross-check against the processed data's shape
    pub fn check_against(&self, params: &NetworkParameters) -> PipelineResult<()> {
        self.validate()?;
        if self.input_size != params.num_cols {
            return Err(invalid(&format!(
                "input_size {} does not match the {} processed feature columns",
                self.input_size, params.num_cols
            )));
        }
        if self.has_sigmoid_output() {
            if params.num_label_classes > 2 {
                return Err(invalid(&format!(
                    "a sigmoid output supports 2 classes, the labels have {}",
                    params.num_label_classes
                )));
            }
        } else if self.output_width() != params.num_label_classes {
            return Err(invalid(&format!(
                "output layer has {} nodes for {} label classes",
                self.output_width(),
                params.num_label_classes
            )));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> PipelineError {
    PipelineError::InvalidConfiguration(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> NetworkConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parses_tagged_layers() {
        let cfg = config(
            r#"{"input_size": 4, "layers": [
                {"type": "dense", "settings": {"nodes": 8, "activation": "relu"}},
                {"type": "dropout", "settings": {"rate": 0.25}},
                {"type": "dense", "settings": {"nodes": 3, "activation": "softmax"}}]}"#,
        );
        assert_eq!(cfg.layers[1], LayerSpec::Dropout { rate: 0.25 });
        assert_eq!(cfg.output_width(), 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_sigmoid_output_is_one_wide() {
        let cfg = config(
            r#"{"input_size": 2, "layers": [
                {"type": "dense", "settings": {"nodes": 2, "activation": "sigmoid"}}]}"#,
        );
        assert!(cfg.has_sigmoid_output());
        assert_eq!(cfg.output_width(), 1);
        let params = NetworkParameters { num_cols: 2, num_label_classes: 2 };
        assert!(cfg.check_against(&params).is_ok());
    }

    #[test]
    fn test_malformed_layers_rejected() {
        let trailing_dropout = config(
            r#"{"input_size": 2, "layers": [
                {"type": "dense", "settings": {"nodes": 2}},
                {"type": "dropout", "settings": {"rate": 0.5}}]}"#,
        );
        assert!(trailing_dropout.validate().is_err());

        let bad_rate = config(
            r#"{"input_size": 2, "layers": [
                {"type": "dropout", "settings": {"rate": 1.5}},
                {"type": "dense", "settings": {"nodes": 2}}]}"#,
        );
        assert!(bad_rate.validate().is_err());

        let relu_single = config(r#"{"input_size": 2, "layers": [{"type": "dense", "settings": {"nodes": 1}}]}"#);
        assert!(relu_single.validate().is_err());
    }

    #[test]
    fn test_shape_mismatch_against_parameters() {
        let cfg = config(r#"{"input_size": 3, "layers": [{"type": "dense", "settings": {"nodes": 2, "activation": "softmax"}}]}"#);
        let wrong_inputs = NetworkParameters { num_cols: 4, num_label_classes: 2 };
        assert!(matches!(cfg.check_against(&wrong_inputs), Err(PipelineError::InvalidConfiguration(_))));
        let wrong_classes = NetworkParameters { num_cols: 3, num_label_classes: 5 };
        assert!(cfg.check_against(&wrong_classes).is_err());
    }
}
