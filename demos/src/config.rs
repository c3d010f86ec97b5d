//! Configuration for the demos.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use semi_hinge_loss::SemiHingeLossConfig;
use serde::{Deserialize, Serialize};

/// Shape and labelling of a synthetic batch of sample pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of sample pairs.
    pub batch_size: usize,
    /// Feature width of each embedding.
    pub width: usize,
    /// Number of distinct class labels, drawn from `0..num_classes`.
    pub num_classes: usize,
    /// Probability that a label is replaced by the ignore label.
    pub unlabelled_ratio: f64,
    /// Standard deviation of the random features.
    pub feature_std: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            width: 8,
            num_classes: 4,
            unlabelled_ratio: 0.3,
            feature_std: 0.5,
        }
    }
}

/// Configuration for the demo commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Loss layer configuration.
    pub loss: SemiHingeLossConfig,
    /// Synthetic batch settings.
    pub batch: BatchConfig,
    /// Random seed for the backend.
    pub seed: u64,
    /// Number of gradient descent steps for `fit`.
    pub steps: usize,
    /// Step size for `fit`.
    pub learning_rate: f64,
    /// Log every this many `fit` steps.
    pub log_every: usize,
    /// Perturbation used by the finite-difference check.
    pub fd_epsilon: f64,
    /// Largest finite-difference error `check` accepts.
    pub fd_tolerance: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            loss: SemiHingeLossConfig::new()
                .with_sup_bias(1.0)
                .with_sup_thre(2.0)
                .with_unsup_bias(1.0)
                .with_unsup_thre(2.0)
                .with_gamma(0.5),
            batch: BatchConfig::default(),
            seed: 42,
            steps: 200,
            learning_rate: 0.5,
            log_every: 20,
            fd_epsilon: 1e-3,
            fd_tolerance: 1e-2,
        }
    }
}

impl DemoConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the demo settings; the loss settings are checked when the layer is built.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch.batch_size > 0, "batch_size must be positive");
        ensure!(self.batch.width > 0, "width must be positive");
        ensure!(self.batch.num_classes > 0, "num_classes must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.batch.unlabelled_ratio),
            "unlabelled_ratio must lie in [0, 1], got {}",
            self.batch.unlabelled_ratio
        );
        ensure!(self.log_every > 0, "log_every must be positive");
        ensure!(self.fd_epsilon > 0.0, "fd_epsilon must be positive");
        Ok(())
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .context("failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DemoConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.loss.validate().is_ok());
    }

    #[test]
    fn config_json_round_trip() {
        let mut config = DemoConfig::default();
        config.batch.width = 3;
        config.loss = config.loss.with_ignore_label(99);

        let json = config.to_json().unwrap();
        let restored: DemoConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.batch.width, 3);
        assert_eq!(restored.loss.ignore_label, 99);
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        let mut config = DemoConfig::default();
        config.batch.unlabelled_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
