//! Synthetic batches of labelled and unlabelled sample pairs.

use burn::{prelude::*, tensor::Distribution};

use crate::config::BatchConfig;

/// One batch of the four layer inputs.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub x0: Tensor<B, 2>,
    pub x1: Tensor<B, 2>,
    pub label0: Tensor<B, 1, Int>,
    pub label1: Tensor<B, 1, Int>,
}

impl<B: Backend> PairBatch<B> {
    /// Draws Gaussian features and uniform class labels, replacing each label with
    /// `ignore_label` with probability `unlabelled_ratio`.
    ///
    /// `ignore_label` should lie outside `0..num_classes`, otherwise that class is unlabelled too.
    pub fn random(config: &BatchConfig, ignore_label: i64, device: &B::Device) -> Self {
        let shape = [config.batch_size, config.width];

        Self {
            x0: Tensor::random(shape, Distribution::Normal(0.0, config.feature_std), device),
            x1: Tensor::random(shape, Distribution::Normal(0.0, config.feature_std), device),
            label0: random_labels(config, ignore_label, device),
            label1: random_labels(config, ignore_label, device),
        }
    }
}

fn random_labels<B: Backend>(
    config: &BatchConfig,
    ignore_label: i64,
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let classes = Tensor::<B, 1>::random(
        [config.batch_size],
        Distribution::Uniform(0.0, config.num_classes as f64),
        device,
    )
    .int();
    let unlabelled = Tensor::<B, 1>::random(
        [config.batch_size],
        Distribution::Bernoulli(config.unlabelled_ratio),
        device,
    )
    .equal_elem(1.0);

    classes.mask_fill(unlabelled, ignore_label)
}
