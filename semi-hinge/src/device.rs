//! Tensor-parallel evaluator.
//!
//! Expresses the per-sample hinge as batched tensor operations so every sample is evaluated
//! independently on the layer's backend, including GPU backends. Results agree with the
//! [sequential evaluator](crate::SemiHingeLoss) up to floating-point reduction order.

use burn::{prelude::*, tensor::cast::ToElement};
use burn_extra_ops::{squared_distance, PairDistance, TensorExtraOps};

use crate::{
    config::SemiHingeLossConfig,
    error::{SemiHingeError, SemiHingeResult},
    layer::{
        check_top_grad, feature_dims, ignore_label_requests, LossLayer, PairGradients, X0, X1,
    },
    shape::{BottomShapes, PairShape},
};

/// Per-sample hinge terms computed on device.
struct DeviceHinge<B: Backend> {
    /// Weighted hinge `l_i`, shape `[N]`.
    losses: Tensor<B, 1>,
    /// `dl_i / dD_i`, zero for inactive samples, shape `[N]`.
    slopes: Tensor<B, 1>,
    /// `1` for samples with both labels present, shape `[N]`.
    supervised: Tensor<B, 1>,
    /// `1` for samples with a strictly positive margin, shape `[N]`.
    active: Tensor<B, 1>,
}

/// Semi-supervised pairwise hinge loss, evaluated with batched tensor operations.
///
/// Burn tensors are immutable values, so each forward binds freshly produced `diff` and `coeff`
/// tensors instead of writing into the previous ones. Reusing their memory across forwards with
/// an unchanged shape is left to the backend's allocator.
#[derive(Debug)]
pub struct DeviceSemiHingeLoss<B: Backend> {
    config: SemiHingeLossConfig,
    device: B::Device,
    shape: Option<PairShape>,
    input_dims: Vec<usize>,
    // x0 - x1 as [N, W]
    diff: Option<Tensor<B, 2>>,
    // dL/dD per sample, already divided by 2N
    coeff: Option<Tensor<B, 1>>,
}

impl<B: Backend> DeviceSemiHingeLoss<B> {
    pub const fn config(&self) -> &SemiHingeLossConfig {
        &self.config
    }

    pub const fn shape(&self) -> Option<PairShape> {
        self.shape
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

        let dist = squared_distance(
            x0.flatten_at(self.config.axis),
            x1.flatten_at(self.config.axis),
        )
        .dist;
        let hinge = self.hinge(
            dist,
            label0.reshape([shape.num]),
            label1.reshape([shape.num]),
        );
        Ok(hinge.losses)
    }

    fn hinge(
        &self,
        dist: Tensor<B, 1>,
        label0: Tensor<B, 1, Int>,
        label1: Tensor<B, 1, Int>,
    ) -> DeviceHinge<B> {
        let SemiHingeLossConfig {
            ignore_label,
            sup_bias,
            unsup_bias,
            gamma,
            sup_thre,
            unsup_thre,
            ..
        } = self.config;

        let missing = label0.clone().equal_elem(ignore_label).float()
            + label1.clone().equal_elem(ignore_label).float();
        let supervised = missing.equal_elem(0.0);

        // y = +1 for equal labels, -1 otherwise
        let y = label0.equal(label1).float().mul_scalar(2.0).sub_scalar(1.0);
        let sup_gap = dist.clone().sub_scalar(sup_thre);
        let sup_margin = (y.clone() * sup_gap).add_scalar(sup_bias);

        let u = dist.neg().add_scalar(unsup_thre);
        let unsup_margin = u.clone().abs().neg().add_scalar(unsup_bias);

        let margin = unsup_margin.mask_where(supervised.clone(), sup_margin);
        let labelled = supervised.clone().float();
        let sign = u.sign_nonneg().mask_where(supervised.clone(), y);
        let weight = margin
            .ones_like()
            .mul_scalar(gamma)
            .mask_fill(supervised, 1.0);

        let active = margin.clone().greater_elem(0.0).float();
        let losses = margin.clamp_min(0.0) * weight.clone();
        let slopes = active.clone() * weight * sign;

        DeviceHinge {
            losses,
            slopes,
            supervised: labelled,
            active,
        }
    }
}

impl<B: Backend> LossLayer<B> for DeviceSemiHingeLoss<B> {
    type Config = SemiHingeLossConfig;

    fn setup(config: &Self::Config, device: &B::Device) -> SemiHingeResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            device: device.clone(),
            shape: None,
            input_dims: Vec::new(),
            diff: None,
            coeff: None,
        })
    }

    fn reshape(&mut self, shapes: &BottomShapes<'_>) -> SemiHingeResult<PairShape> {
        let shape = PairShape::bind(shapes, self.config.axis)?;
        if self.shape != Some(shape) {
            tracing::debug!(
                num = shape.num,
                width = shape.width,
                "binding semi-hinge device scratch"
            );
            self.diff = None;
            self.coeff = None;
            self.shape = Some(shape);
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
        self.diff = None;
        self.coeff = None;
        let (dims0, dims1, dims_l0, dims_l1) =
            (x0.dims(), x1.dims(), label0.dims(), label1.dims());
        let shape = self.reshape(&BottomShapes {
            x0: &dims0,
            x1: &dims1,
            label0: &dims_l0,
            label1: &dims_l1,
        })?;

        let PairDistance { diff, dist } = squared_distance(
            x0.flatten_at(self.config.axis).to_device(&self.device),
            x1.flatten_at(self.config.axis).to_device(&self.device),
        );
        let hinge = self.hinge(
            dist,
            label0.reshape([shape.num]).to_device(&self.device),
            label1.reshape([shape.num]).to_device(&self.device),
        );

        let normalizer = shape.normalizer();
        let loss = hinge.losses.sum().div_scalar(normalizer);
        if tracing::enabled!(tracing::Level::TRACE) {
            let supervised = hinge.supervised.sum().into_scalar().to_f64().round() as usize;
            tracing::trace!(
                supervised,
                unsupervised = shape.num - supervised,
                active = hinge.active.sum().into_scalar().to_f64().round() as usize,
                loss = loss.clone().into_scalar().to_f64(),
                "semi-hinge device forward"
            );
        }

        self.input_dims = dims0.to_vec();
        self.diff = Some(diff);
        self.coeff = Some(hinge.slopes.div_scalar(normalizer));

        Ok(loss)
    }

    fn backward<const D: usize>(
        &self,
        top_grad: Tensor<B, 1>,
        propagate_down: [bool; 4],
    ) -> SemiHingeResult<PairGradients<B, D>> {
        let (Some(diff), Some(coeff)) = (&self.diff, &self.coeff) else {
            return Err(SemiHingeError::BackwardBeforeForward);
        };
        let dims = feature_dims::<D>(&self.input_dims)?;
        check_top_grad(&top_grad)?;
        ignore_label_requests(&propagate_down);

        if !propagate_down[X0] && !propagate_down[X1] {
            return Ok(PairGradients::none());
        }

        // dL/dx0 = top * dL/dD * 2 * diff, broadcast over the feature width
        let scale = coeff.clone().mul_scalar(2.0).unsqueeze_dim::<2>(1)
            * top_grad.to_device(&self.device).reshape([1, 1]);
        let grad = diff.clone() * scale;

        let x1 = propagate_down[X1].then(|| grad.clone().neg().reshape(dims));
        let x0 = propagate_down[X0].then(|| grad.reshape(dims));

        Ok(PairGradients { x0, x1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::NdArray,
        tensor::{ops::FloatElem, Tolerance},
    };

    type TestBackend = NdArray;
    type FT = FloatElem<TestBackend>;

    fn layer(config: SemiHingeLossConfig) -> DeviceSemiHingeLoss<TestBackend> {
        config
            .init_device(&Default::default())
            .expect("valid config")
    }

    #[test]
    fn device_forward_mixed_regimes() {
        let device = Default::default();
        let mut loss = layer(
            SemiHingeLossConfig::new()
                .with_sup_thre(2.0)
                .with_unsup_thre(0.0)
                .with_unsup_bias(2.0),
        );

        let value = loss
            .forward(
                Tensor::<TestBackend, 2>::from_data([[1.0, 0.0], [2.0, 2.0]], &device),
                Tensor::<TestBackend, 2>::from_data([[0.0, 0.0], [1.0, 2.0]], &device),
                Tensor::<TestBackend, 1, Int>::from_data([5, -1], &device),
                Tensor::<TestBackend, 1, Int>::from_data([5, 5], &device),
            )
            .unwrap();

        value
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.25]), Tolerance::default());
        assert_eq!(loss.shape(), Some(PairShape { num: 2, width: 2 }));
    }

    #[test]
    fn device_supervised_different_labels_push_apart() {
        let device = Default::default();
        let mut loss = layer(SemiHingeLossConfig::new().with_sup_thre(2.0));

        // D = 1, y = -1, margin = 1 + (2 - 1) = 2
        let value = loss
            .forward(
                Tensor::<TestBackend, 2>::from_data([[1.0, 0.0]], &device),
                Tensor::<TestBackend, 2>::from_data([[0.0, 0.0]], &device),
                Tensor::<TestBackend, 1, Int>::from_data([1], &device),
                Tensor::<TestBackend, 1, Int>::from_data([2], &device),
            )
            .unwrap();
        value
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([1.0]), Tolerance::default());

        let grads = loss
            .backward::<2>(Tensor::ones([1], &device), [true, true, false, false])
            .unwrap();
        grads.x0.unwrap().into_data().assert_approx_eq::<FT>(
            &TensorData::from([[-1.0, 0.0]]),
            Tolerance::default(),
        );
        grads.x1.unwrap().into_data().assert_approx_eq::<FT>(
            &TensorData::from([[1.0, 0.0]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn device_hinge_marks_regimes_and_active_samples() {
        let device = Default::default();
        let loss = layer(
            SemiHingeLossConfig::new()
                .with_sup_thre(2.0)
                .with_unsup_thre(0.0)
                .with_unsup_bias(2.0),
        );

        // supervised at zero margin, unsupervised active, supervised active
        let hinge = loss.hinge(
            Tensor::<TestBackend, 1>::from_data([1.0, 1.0, 3.0], &device),
            Tensor::<TestBackend, 1, Int>::from_data([5, -1, 4], &device),
            Tensor::<TestBackend, 1, Int>::from_data([5, 5, 4], &device),
        );

        hinge
            .supervised
            .into_data()
            .assert_eq(&TensorData::from([1.0f32, 0.0, 1.0]), false);
        hinge
            .active
            .into_data()
            .assert_eq(&TensorData::from([0.0f32, 1.0, 1.0]), false);
        hinge
            .losses
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.0, 1.0, 2.0]), Tolerance::default());
        hinge
            .slopes
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.0, -1.0, 1.0]), Tolerance::default());
    }

    #[test]
    fn device_failed_forward_clears_scratch() {
        let device = Default::default();
        let mut loss = layer(SemiHingeLossConfig::new());

        loss.forward(
            Tensor::<TestBackend, 2>::from_data([[1.0, 0.0]], &device),
            Tensor::<TestBackend, 2>::zeros([1, 2], &device),
            Tensor::<TestBackend, 1, Int>::from_data([1], &device),
            Tensor::<TestBackend, 1, Int>::from_data([2], &device),
        )
        .unwrap();
        assert!(loss.diff.is_some() && loss.coeff.is_some());

        let result = loss.forward(
            Tensor::<TestBackend, 2>::zeros([3, 2], &device),
            Tensor::<TestBackend, 2>::zeros([3, 2], &device),
            Tensor::<TestBackend, 1, Int>::zeros([2], &device),
            Tensor::<TestBackend, 1, Int>::zeros([2], &device),
        );

        assert!(matches!(result, Err(SemiHingeError::ShapeMismatch { .. })));
        assert!(loss.diff.is_none());
        assert!(loss.coeff.is_none());
    }

    #[test]
    fn device_backward_before_forward_fails() {
        let loss = layer(SemiHingeLossConfig::new());
        let top = Tensor::<TestBackend, 1>::ones([1], &Default::default());

        assert!(matches!(
            loss.backward::<2>(top, [true, true, false, false]),
            Err(SemiHingeError::BackwardBeforeForward)
        ));
    }

    #[test]
    fn device_forward_no_reduction_keeps_scratch_empty() {
        let device = Default::default();
        let loss = layer(
            SemiHingeLossConfig::new()
                .with_unsup_thre(0.0)
                .with_unsup_bias(2.0),
        );

        let per_sample = loss
            .forward_no_reduction(
                Tensor::<TestBackend, 2>::from_data([[1.0, 0.0], [0.0, 0.0]], &device),
                Tensor::<TestBackend, 2>::zeros([2, 2], &device),
                Tensor::<TestBackend, 1, Int>::from_data([-1, -1], &device),
                Tensor::<TestBackend, 1, Int>::from_data([5, -1], &device),
            )
            .unwrap();

        per_sample
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([1.0, 2.0]), Tolerance::default());
        assert!(loss.shape().is_none());
    }

    #[test]
    fn device_rejects_mismatched_labels() {
        let device = Default::default();
        let mut loss = layer(SemiHingeLossConfig::new());

        let result = loss.forward(
            Tensor::<TestBackend, 2>::zeros([3, 2], &device),
            Tensor::<TestBackend, 2>::zeros([3, 2], &device),
            Tensor::<TestBackend, 1, Int>::zeros([3], &device),
            Tensor::<TestBackend, 1, Int>::zeros([4], &device),
        );

        assert!(matches!(result, Err(SemiHingeError::ShapeMismatch { .. })));
    }
}
