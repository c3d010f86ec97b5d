//! Sequential evaluator.
//!
//! Reads the inputs back to the host and evaluates one sample at a time in `f64`. Scratch
//! buffers are owned by the layer and reallocated only when the bound `(N, W)` changes.

use burn::prelude::*;

use crate::{
    config::SemiHingeLossConfig,
    error::{SemiHingeError, SemiHingeResult},
    layer::{
        feature_dims, ignore_label_requests, top_grad_scalar, LossLayer, PairGradients, X0, X1,
    },
    regime::{HingeTerm, SampleRegime},
    shape::{BottomShapes, PairShape},
};

/// Counts and loss of the most recent forward pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForwardStats {
    /// Samples with both labels present.
    pub supervised: usize,
    /// Samples with at least one ignored label.
    pub unsupervised: usize,
    /// Samples whose hinge margin was strictly positive.
    pub active: usize,
    /// Total loss, already divided by `2N`.
    pub loss: f64,
}

impl ForwardStats {
    fn record(&mut self, term: &HingeTerm) {
        match term.regime {
            SampleRegime::Supervised => self.supervised += 1,
            SampleRegime::Unsupervised => self.unsupervised += 1,
        }
        if term.active {
            self.active += 1;
        }
    }
}

/// Semi-supervised pairwise hinge loss, evaluated sample by sample on the host.
#[derive(Debug)]
pub struct SemiHingeLoss<B: Backend> {
    config: SemiHingeLossConfig,
    device: B::Device,
    shape: Option<PairShape>,
    input_dims: Vec<usize>,
    // x0 - x1, row-major [N, W]
    diff: Vec<f64>,
    terms: Vec<HingeTerm>,
    stats: Option<ForwardStats>,
}

impl<B: Backend> SemiHingeLoss<B> {
    pub const fn config(&self) -> &SemiHingeLossConfig {
        &self.config
    }

    /// The `(N, W)` bound by the last reshape.
    pub const fn shape(&self) -> Option<PairShape> {
        self.shape
    }

    /// The difference buffer of the last forward, row-major `[N, W]`.
    pub fn diff(&self) -> &[f64] {
        &self.diff
    }

    /// The per-sample hinge state of the last forward.
    pub fn terms(&self) -> &[HingeTerm] {
        &self.terms
    }

    /// Statistics of the last successful forward.
    pub const fn last_stats(&self) -> Option<ForwardStats> {
        self.stats
    }

    /// Computes the weighted per-sample hinge terms `l_i` without the `1 / 2N` reduction.
    ///
    /// Scratch state is left untouched, so this does not prepare a backward pass.
    ///
    /// # Shapes
    /// - output: `[N]`
    pub fn forward_no_reduction<const D: usize, const L: usize>(
        &self,
        x0: Tensor<B, D>,
        x1: Tensor<B, D>,
        label0: Tensor<B, L, Int>,
        label1: Tensor<B, L, Int>,
    ) -> SemiHingeResult<Tensor<B, 1>> {
        let (dims0, dims1, dims_l0, dims_l1) =
            (x0.dims(), x1.dims(), label0.dims(), label1.dims());
        let shape = PairShape::bind(
            &BottomShapes {
                x0: &dims0,
                x1: &dims1,
                label0: &dims_l0,
                label1: &dims_l1,
            },
            self.config.axis,
        )?;

        let x0 = read_features(x0)?;
        let x1 = read_features(x1)?;
        let label0 = read_labels(label0)?;
        let label1 = read_labels(label1)?;

        let losses: Vec<f64> = x0
            .chunks_exact(shape.width)
            .zip(x1.chunks_exact(shape.width))
            .zip(label0.iter().zip(&label1))
            .map(|((row0, row1), (&l0, &l1))| {
                let dist = row0
                    .iter()
                    .zip(row1)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                HingeTerm::evaluate(&self.config, l0, l1, dist).0
            })
            .collect();

        Ok(Tensor::from_data(
            TensorData::new(losses, [shape.num]),
            &self.device,
        ))
    }

    fn gradient_tensor<const D: usize>(&self, values: Vec<f64>, dims: [usize; D]) -> Tensor<B, D> {
        Tensor::from_data(TensorData::new(values, dims), &self.device)
    }
}

impl<B: Backend> LossLayer<B> for SemiHingeLoss<B> {
    type Config = SemiHingeLossConfig;

    fn setup(config: &Self::Config, device: &B::Device) -> SemiHingeResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            device: device.clone(),
            shape: None,
            input_dims: Vec::new(),
            diff: Vec::new(),
            terms: Vec::new(),
            stats: None,
        })
    }

    fn reshape(&mut self, shapes: &BottomShapes<'_>) -> SemiHingeResult<PairShape> {
        let shape = PairShape::bind(shapes, self.config.axis)?;
        if self.shape != Some(shape) {
            tracing::debug!(
                num = shape.num,
                width = shape.width,
                "allocating semi-hinge scratch buffers"
            );
            self.diff = vec![0.0; shape.len()];
            self.terms = vec![HingeTerm::default(); shape.num];
            self.shape = Some(shape);
            self.stats = None;
        }
        Ok(shape)
    }

    fn forward<const D: usize, const L: usize>(
        &mut self,
        x0: Tensor<B, D>,
        x1: Tensor<B, D>,
        label0: Tensor<B, L, Int>,
        label1: Tensor<B, L, Int>,
    ) -> SemiHingeResult<Tensor<B, 1>> {
        // a failed forward must not leave the previous batch for backward
        self.stats = None;
        let (dims0, dims1, dims_l0, dims_l1) =
            (x0.dims(), x1.dims(), label0.dims(), label1.dims());
        let shape = self.reshape(&BottomShapes {
            x0: &dims0,
            x1: &dims1,
            label0: &dims_l0,
            label1: &dims_l1,
        })?;

        let x0 = read_features(x0)?;
        let x1 = read_features(x1)?;
        let label0 = read_labels(label0)?;
        let label1 = read_labels(label1)?;

        let mut stats = ForwardStats::default();
        let mut total = 0.0;
        let rows = x0
            .chunks_exact(shape.width)
            .zip(x1.chunks_exact(shape.width))
            .zip(self.diff.chunks_exact_mut(shape.width));

        for (i, ((row0, row1), diff_row)) in rows.enumerate() {
            let mut dist = 0.0;
            for ((d, a), b) in diff_row.iter_mut().zip(row0).zip(row1) {
                *d = a - b;
                dist += *d * *d;
            }

            let (loss, term) = HingeTerm::evaluate(&self.config, label0[i], label1[i], dist);
            stats.record(&term);
            self.terms[i] = term;
            total += loss;
        }

        stats.loss = total / shape.normalizer();
        tracing::trace!(
            supervised = stats.supervised,
            unsupervised = stats.unsupervised,
            active = stats.active,
            loss = stats.loss,
            "semi-hinge forward"
        );

        self.input_dims = dims0.to_vec();
        self.stats = Some(stats);

        Ok(Tensor::from_data(
            TensorData::new(vec![stats.loss], [1]),
            &self.device,
        ))
    }

    fn backward<const D: usize>(
        &self,
        top_grad: Tensor<B, 1>,
        propagate_down: [bool; 4],
    ) -> SemiHingeResult<PairGradients<B, D>> {
        let shape = match (self.shape, self.stats) {
            (Some(shape), Some(_)) => shape,
            _ => return Err(SemiHingeError::BackwardBeforeForward),
        };
        let dims = feature_dims::<D>(&self.input_dims)?;
        let top = top_grad_scalar(top_grad)?;
        ignore_label_requests(&propagate_down);

        if !propagate_down[X0] && !propagate_down[X1] {
            return Ok(PairGradients::none());
        }

        let scale = top / shape.normalizer();
        let mut grad = vec![0.0; shape.len()];
        let rows = grad
            .chunks_exact_mut(shape.width)
            .zip(self.diff.chunks_exact(shape.width))
            .zip(&self.terms);

        for ((grad_row, diff_row), term) in rows {
            let slope = term.slope(self.config.gamma);
            if slope == 0.0 {
                continue;
            }
            // d(D)/d(x0) = 2 * diff
            let factor = 2.0 * slope * scale;
            for (g, d) in grad_row.iter_mut().zip(diff_row) {
                *g = factor * d;
            }
        }

        let x1 = propagate_down[X1].then(|| {
            self.gradient_tensor(grad.iter().map(|g| -g).collect(), dims)
        });
        let x0 = propagate_down[X0].then(|| self.gradient_tensor(grad, dims));

        Ok(PairGradients { x0, x1 })
    }
}

fn read_features<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> SemiHingeResult<Vec<f64>> {
    tensor
        .into_data()
        .convert::<f64>()
        .into_vec::<f64>()
        .map_err(|err| SemiHingeError::InvalidTensorData {
            reason: format!("{err:?}"),
        })
}

fn read_labels<B: Backend, const L: usize>(
    tensor: Tensor<B, L, Int>,
) -> SemiHingeResult<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .into_vec::<i64>()
        .map_err(|err| SemiHingeError::InvalidTensorData {
            reason: format!("{err:?}"),
        })
}
