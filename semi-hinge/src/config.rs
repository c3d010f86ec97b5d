use burn::prelude::*;

use crate::{
    device::DeviceSemiHingeLoss,
    error::{SemiHingeError, SemiHingeResult},
    layer::LossLayer,
    sequential::SemiHingeLoss,
};

/// Configuration for the [semi-supervised hinge loss](SemiHingeLoss).
///
/// The supervised term is `max(0, sup_bias - y * (sup_thre - D))` and the unsupervised term is
/// `gamma * max(0, unsup_bias - |unsup_thre - D|)`, where `D` is the squared Euclidean distance
/// of a feature pair and `y` is `+1` for equal labels and `-1` otherwise.
#[derive(Config, Debug)]
pub struct SemiHingeLossConfig {
    /// Label value marking a sample side as unlabelled.
    #[config(default = "-1")]
    pub ignore_label: i64,
    /// Margin of the supervised hinge. Must be non-negative.
    #[config(default = "1.0")]
    pub sup_bias: f64,
    /// Margin of the unsupervised hinge. Must be non-negative.
    #[config(default = "1.0")]
    pub unsup_bias: f64,
    /// Weight of the unsupervised term; the supervised term has weight 1.
    #[config(default = "1.0")]
    pub gamma: f64,
    /// Distance threshold of the supervised hinge.
    #[config(default = "1.0")]
    pub sup_thre: f64,
    /// Distance threshold of the unsupervised hinge.
    #[config(default = "1.0")]
    pub unsup_thre: f64,
    /// First feature axis. Dimensions before it form the sample count, the rest the feature width.
    #[config(default = "1")]
    pub axis: usize,
}

impl SemiHingeLossConfig {
    /// Checks that every parameter lies in its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`SemiHingeError::InvalidConfiguration`] for a negative or non-finite margin or
    /// weight, and for a non-finite threshold.
    pub fn validate(&self) -> SemiHingeResult<()> {
        non_negative("sup_bias", self.sup_bias)?;
        non_negative("unsup_bias", self.unsup_bias)?;
        non_negative("gamma", self.gamma)?;
        finite("sup_thre", self.sup_thre)?;
        finite("unsup_thre", self.unsup_thre)?;
        Ok(())
    }

    /// Initialize the sequential evaluator.
    ///
    /// # Errors
    ///
    /// Returns an error if [`validate`](Self::validate) fails.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SemiHingeResult<SemiHingeLoss<B>> {
        SemiHingeLoss::setup(self, device)
    }

    /// Initialize the tensor-parallel evaluator.
    ///
    /// # Errors
    ///
    /// Returns an error if [`validate`](Self::validate) fails.
    pub fn init_device<B: Backend>(
        &self,
        device: &B::Device,
    ) -> SemiHingeResult<DeviceSemiHingeLoss<B>> {
        DeviceSemiHingeLoss::setup(self, device)
    }
}

fn finite(parameter: &str, value: f64) -> SemiHingeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SemiHingeError::invalid_parameter(
            parameter,
            format!("must be finite, got {value}"),
        ))
    }
}

fn non_negative(parameter: &str, value: f64) -> SemiHingeResult<()> {
    finite(parameter, value)?;
    if value < 0.0 {
        return Err(SemiHingeError::invalid_parameter(
            parameter,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_config_defaults() {
        let config = SemiHingeLossConfig::new();
        assert_eq!(config.ignore_label, -1);
        assert_eq!(config.sup_bias, 1.0);
        assert_eq!(config.unsup_bias, 1.0);
        assert_eq!(config.gamma, 1.0);
        assert_eq!(config.sup_thre, 1.0);
        assert_eq!(config.unsup_thre, 1.0);
        assert_eq!(config.axis, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SemiHingeLossConfig::new()
            .with_ignore_label(255)
            .with_sup_bias(0.5)
            .with_gamma(0.1)
            .with_axis(2);
        assert_eq!(config.ignore_label, 255);
        assert_eq!(config.sup_bias, 0.5);
        assert_eq!(config.gamma, 0.1);
        assert_eq!(config.axis, 2);
    }

    #[test]
    fn test_zero_margins_are_valid() {
        let config = SemiHingeLossConfig::new()
            .with_sup_bias(0.0)
            .with_unsup_bias(0.0)
            .with_gamma(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_sup_bias_rejected() {
        let config = SemiHingeLossConfig::new().with_sup_bias(-0.1);

        match config.validate() {
            Err(SemiHingeError::InvalidConfiguration { parameter, reason }) => {
                assert_eq!(parameter, "sup_bias");
                assert!(reason.contains("non-negative"));
            }
            other => panic!("Expected InvalidConfiguration error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_unsup_bias_rejected() {
        let config = SemiHingeLossConfig::new().with_unsup_bias(-1.0);
        assert!(matches!(
            config.validate(),
            Err(SemiHingeError::InvalidConfiguration { parameter, .. }) if parameter == "unsup_bias"
        ));
    }

    #[test]
    fn test_negative_gamma_rejected() {
        let config = SemiHingeLossConfig::new().with_gamma(-2.0);
        assert!(matches!(
            config.validate(),
            Err(SemiHingeError::InvalidConfiguration { parameter, .. }) if parameter == "gamma"
        ));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let config = SemiHingeLossConfig::new().with_unsup_thre(f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(SemiHingeError::InvalidConfiguration { parameter, reason })
                if parameter == "unsup_thre" && reason.contains("finite")
        ));
    }

    #[test]
    fn test_init_fails_fast_on_invalid_config() {
        let device = Default::default();
        let config = SemiHingeLossConfig::new().with_gamma(-1.0);

        assert!(config.init::<TestBackend>(&device).is_err());
        assert!(config.init_device::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = SemiHingeLossConfig::new()
            .with_ignore_label(7)
            .with_unsup_thre(0.25);

        let json = config.to_string();
        let restored = SemiHingeLossConfig::load_binary(json.as_bytes())
            .expect("config should deserialize from its own JSON");

        assert_eq!(restored.ignore_label, 7);
        assert_eq!(restored.unsup_thre, 0.25);
        assert_eq!(restored.axis, config.axis);
    }
}
