//! Gradient descent on free embedding pairs.
//!
//! The embeddings themselves are the parameters, so the layer's feature gradients are the
//! full parameter gradients. Same-label pairs are pulled inside `sup_thre`, different-label
//! pairs pushed beyond it, and unlabelled pairs pushed out of the band around `unsup_thre`.

use anyhow::Result;
use burn::{prelude::*, tensor::cast::ToElement};
use semi_hinge_loss::LossLayer;

use crate::{batch::PairBatch, config::DemoConfig, FEATURES_ONLY};

/// Loss before and after fitting.
#[derive(Debug, Clone, Copy)]
pub struct FitReport {
    pub initial_loss: f64,
    pub final_loss: f64,
    pub steps: usize,
}

/// Runs `config.steps` plain gradient descent steps with the device evaluator.
pub fn run_fit<B: Backend>(config: &DemoConfig, device: &B::Device) -> Result<FitReport> {
    B::seed(config.seed);
    let mut layer = config.loss.init_device::<B>(device)?;
    let PairBatch {
        mut x0,
        mut x1,
        label0,
        label1,
    } = PairBatch::<B>::random(&config.batch, config.loss.ignore_label, device);

    let mut initial_loss = None;
    for step in 0..config.steps {
        let loss = layer
            .forward(x0.clone(), x1.clone(), label0.clone(), label1.clone())?
            .into_scalar()
            .to_f64();
        initial_loss.get_or_insert(loss);
        if step % config.log_every == 0 {
            tracing::info!(step, loss, "fit step");
        }

        let grads = layer.backward::<2>(Tensor::ones([1], device), FEATURES_ONLY)?;
        if let Some(grad) = grads.x0 {
            x0 = x0 - grad.mul_scalar(config.learning_rate);
        }
        if let Some(grad) = grads.x1 {
            x1 = x1 - grad.mul_scalar(config.learning_rate);
        }
    }

    let final_loss = layer
        .forward(x0, x1, label0, label1)?
        .into_scalar()
        .to_f64();

    Ok(FitReport {
        initial_loss: initial_loss.unwrap_or(final_loss),
        final_loss,
        steps: config.steps,
    })
}
