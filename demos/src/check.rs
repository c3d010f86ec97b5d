//! Gradient check: sequential versus device evaluator, and analytic versus numeric gradients.

use anyhow::{anyhow, Context, Result};
use burn::{prelude::*, tensor::cast::ToElement};
use semi_hinge_loss::{ForwardStats, LossLayer, SemiHingeLoss};

use crate::{batch::PairBatch, config::DemoConfig, FEATURES_ONLY};

/// Outcome of one gradient check.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub sequential_loss: f64,
    pub device_loss: f64,
    /// Largest absolute difference between the two evaluators' gradients.
    pub max_gradient_gap: f64,
    /// Largest absolute difference between analytic and central-difference gradients.
    pub max_numeric_error: f64,
    /// Number of coordinates probed by finite differences.
    pub probes: usize,
    pub stats: ForwardStats,
}

impl CheckReport {
    /// Whether the finite-difference error is within `tolerance`.
    pub fn passed(&self, tolerance: f64) -> bool {
        self.max_numeric_error <= tolerance
    }
}

/// Runs both evaluators on one random batch and probes `probes` coordinates of `x0`
/// with central differences.
pub fn run_check<B: Backend>(
    config: &DemoConfig,
    device: &B::Device,
    probes: usize,
) -> Result<CheckReport> {
    B::seed(config.seed);
    let mut sequential = config.loss.init::<B>(device)?;
    let mut parallel = config.loss.init_device::<B>(device)?;
    let batch = PairBatch::<B>::random(&config.batch, config.loss.ignore_label, device);

    let sequential_loss = sequential
        .forward(
            batch.x0.clone(),
            batch.x1.clone(),
            batch.label0.clone(),
            batch.label1.clone(),
        )?
        .into_scalar()
        .to_f64();
    let stats = sequential
        .last_stats()
        .context("forward finished without statistics")?;
    let device_loss = parallel
        .forward(
            batch.x0.clone(),
            batch.x1.clone(),
            batch.label0.clone(),
            batch.label1.clone(),
        )?
        .into_scalar()
        .to_f64();
    tracing::debug!(
        supervised = stats.supervised,
        unsupervised = stats.unsupervised,
        active = stats.active,
        "batch evaluated"
    );

    let top = Tensor::<B, 1>::ones([1], device);
    let seq = sequential.backward::<2>(top.clone(), FEATURES_ONLY)?;
    let par = parallel.backward::<2>(top, FEATURES_ONLY)?;

    let seq_x0 = host(seq.x0.context("missing x0 gradient")?)?;
    let seq_x1 = host(seq.x1.context("missing x1 gradient")?)?;
    let par_x0 = host(par.x0.context("missing x0 gradient")?)?;
    let par_x1 = host(par.x1.context("missing x1 gradient")?)?;
    let max_gradient_gap = max_gap(&seq_x0, &par_x0).max(max_gap(&seq_x1, &par_x1));

    let x0 = host(batch.x0)?;
    let x1 = host(batch.x1)?;
    let stride = (x0.len() / probes.max(1)).max(1);
    let width = config.batch.width;

    let mut max_numeric_error: f64 = 0.0;
    let mut probed = 0;
    for index in (0..x0.len()).step_by(stride).take(probes) {
        let mut plus = x0.clone();
        let mut minus = x0.clone();
        plus[index] += config.fd_epsilon;
        minus[index] -= config.fd_epsilon;

        let labels = (&batch.label0, &batch.label1);
        let up = loss_at(&mut sequential, &plus, &x1, width, labels, device)?;
        let down = loss_at(&mut sequential, &minus, &x1, width, labels, device)?;
        let numeric = (up - down) / (2.0 * config.fd_epsilon);

        let error = (numeric - seq_x0[index]).abs();
        tracing::trace!(index, numeric, analytic = seq_x0[index], "probe");
        max_numeric_error = max_numeric_error.max(error);
        probed += 1;
    }

    Ok(CheckReport {
        sequential_loss,
        device_loss,
        max_gradient_gap,
        max_numeric_error,
        probes: probed,
        stats,
    })
}

fn loss_at<B: Backend>(
    layer: &mut SemiHingeLoss<B>,
    x0: &[f64],
    x1: &[f64],
    width: usize,
    (label0, label1): (&Tensor<B, 1, Int>, &Tensor<B, 1, Int>),
    device: &B::Device,
) -> Result<f64> {
    let rows = x0.len() / width;
    let x0 = Tensor::from_data(TensorData::new(x0.to_vec(), [rows, width]), device);
    let x1 = Tensor::from_data(TensorData::new(x1.to_vec(), [rows, width]), device);
    let loss = layer.forward::<2, 1>(x0, x1, label0.clone(), label1.clone())?;
    Ok(loss.into_scalar().to_f64())
}

fn host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>> {
    tensor
        .into_data()
        .convert::<f64>()
        .into_vec::<f64>()
        .map_err(|err| anyhow!("failed to read tensor data: {err:?}"))
}

fn max_gap(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn check_passes_on_default_config() {
        let config = DemoConfig::default();
        let report = run_check::<NdArray<f64>>(&config, &Default::default(), 8)
            .expect("check should run");

        assert_eq!(report.probes, 8);
        assert!(report.sequential_loss >= 0.0);
        assert!((report.sequential_loss - report.device_loss).abs() < 1e-9);
        assert!(report.max_gradient_gap < 1e-9);
        assert!(
            report.passed(1e-4),
            "numeric error {}",
            report.max_numeric_error
        );
        assert_eq!(
            report.stats.supervised + report.stats.unsupervised,
            config.batch.batch_size
        );
    }

    #[test]
    fn max_gap_takes_largest_difference() {
        assert_eq!(max_gap(&[1.0, 2.0, 3.0], &[1.0, 2.5, 2.0]), 1.0);
    }
}
