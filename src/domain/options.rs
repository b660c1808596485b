// ============================================================
// Layer 3 - Processing Options
// ============================================================
// User-selected preprocessing switches and split ratios, in the
// camelCase JSON shape the upload UI sends.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureScaling {
    #[default]
    None,
    Standardization,
    Normalization,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub remove_duplicates:     bool,
    pub handle_missing_values: bool,
    pub encode_categorical:    bool,
    pub feature_scaling:       FeatureScaling,
}

/// Fractions of the dataset assigned to train and validation;
/// the remainder becomes the test partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRatios {
    pub train_size:      f64,
    pub validation_size: f64,
}

impl SplitRatios {
    pub fn validate(&self) -> PipelineResult<()> {
        for (name, v) in [("trainSize", self.train_size), ("validationSize", self.validation_size)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "{name} must be between 0 and 1, got {v}"
                )));
            }
        }
        // small epsilon so 0.7 + 0.3 is not rejected by float rounding
        if self.train_size + self.validation_size > 1.0 + 1e-9 {
            return Err(PipelineError::InvalidConfiguration(format!(
                "trainSize + validationSize must not exceed 1, got {} + {}",
                self.train_size, self.validation_size
            )));
        }
        Ok(())
    }

    pub fn test_size(&self) -> f64 {
        (1.0 - self.train_size - self.validation_size).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_parse_camel_case() {
        let json = r#"{"removeDuplicates":true,"handleMissingValues":false,
                       "encodeCategorical":true,"featureScaling":"standardization"}"#;
        let opts: ProcessingOptions = serde_json::from_str(json).unwrap();
        assert!(opts.remove_duplicates);
        assert!(!opts.handle_missing_values);
        assert_eq!(opts.feature_scaling, FeatureScaling::Standardization);
    }

    #[test]
    fn test_missing_option_fields_default_off() {
        let opts: ProcessingOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, ProcessingOptions::default());
    }

    #[test]
    fn test_split_over_one_rejected() {
        let ratios = SplitRatios { train_size: 0.7, validation_size: 0.4 };
        assert!(matches!(ratios.validate(), Err(PipelineError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_split_summing_to_one_accepted() {
        let ratios = SplitRatios { train_size: 0.7, validation_size: 0.3 };
        assert!(ratios.validate().is_ok());
        assert!(ratios.test_size() < 1e-9);
    }
}
