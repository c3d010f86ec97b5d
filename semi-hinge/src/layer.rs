//! The loss layer interface shared by both evaluators.

use burn::{prelude::*, tensor::cast::ToElement};

use crate::{
    error::{SemiHingeError, SemiHingeResult},
    shape::{BottomShapes, PairShape, TOP_SHAPE},
};

/// Bottom index of the first feature input.
pub const X0: usize = 0;
/// Bottom index of the second feature input.
pub const X1: usize = 1;
/// Bottom index of the first label input.
pub const LABEL0: usize = 2;
/// Bottom index of the second label input.
pub const LABEL1: usize = 3;

/// Gradients of the loss with respect to the two feature inputs.
///
/// There are no label slots: labels are discrete annotations and never receive gradients.
#[derive(Debug, Clone)]
pub struct PairGradients<B: Backend, const D: usize> {
    /// `dL/dx0`, or `None` when not requested.
    pub x0: Option<Tensor<B, D>>,
    /// `dL/dx1`, or `None` when not requested.
    pub x1: Option<Tensor<B, D>>,
}

impl<B: Backend, const D: usize> PairGradients<B, D> {
    pub(crate) const fn none() -> Self {
        Self { x0: None, x1: None }
    }
}

/// A loss layer consuming `(x0, x1, label0, label1)` and producing a scalar loss.
///
/// Calls must alternate `forward` then `backward` on one instance: backward reads the scratch
/// state of the most recent forward. The instance is not internally synchronized.
pub trait LossLayer<B: Backend>: Sized {
    /// Construction parameters.
    type Config;

    /// Validates `config` and builds a layer bound to `device`.
    fn setup(config: &Self::Config, device: &B::Device) -> SemiHingeResult<Self>;

    /// Binds the input shapes and resizes scratch state when `(N, W)` changed.
    fn reshape(&mut self, shapes: &BottomShapes<'_>) -> SemiHingeResult<PairShape>;

    /// Shape of the loss output.
    fn top_shape(&self) -> [usize; 1] {
        TOP_SHAPE
    }

    /// Computes the total loss of a batch of sample pairs.
    ///
    /// # Shapes
    /// - x0, x1: `[...samples, ...features]`, split at the configured axis
    /// - label0, label1: any shape holding one label per sample
    /// - output: `[1]`
    fn forward<const D: usize, const L: usize>(
        &mut self,
        x0: Tensor<B, D>,
        x1: Tensor<B, D>,
        label0: Tensor<B, L, Int>,
        label1: Tensor<B, L, Int>,
    ) -> SemiHingeResult<Tensor<B, 1>>;

    /// Propagates `top_grad` (shape `[1]`) back to the feature inputs.
    ///
    /// `propagate_down` is indexed by bottom position. Entries [`LABEL0`] and [`LABEL1`] are
    /// ignored. Returned gradients are fresh tensors; accumulation is left to the caller.
    fn backward<const D: usize>(
        &self,
        top_grad: Tensor<B, 1>,
        propagate_down: [bool; 4],
    ) -> SemiHingeResult<PairGradients<B, D>>;
}

/// Logs and drops any gradient request on a label input.
pub(crate) fn ignore_label_requests(propagate_down: &[bool; 4]) {
    if propagate_down[LABEL0] || propagate_down[LABEL1] {
        tracing::debug!(
            label0 = propagate_down[LABEL0],
            label1 = propagate_down[LABEL1],
            "gradient requested on a label input; labels are not differentiable, ignoring"
        );
    }
}

/// Recovers the cached feature dimensions as a rank-`D` shape.
pub(crate) fn feature_dims<const D: usize>(cached: &[usize]) -> SemiHingeResult<[usize; D]> {
    cached.try_into().map_err(|_| {
        SemiHingeError::shape_mismatch(
            format!("gradient rank {} of the last forward", cached.len()),
            format!("rank {D}"),
        )
    })
}

/// Checks that the upstream gradient has the loss output shape.
pub(crate) fn check_top_grad<B: Backend>(top_grad: &Tensor<B, 1>) -> SemiHingeResult<()> {
    let dims = top_grad.dims();
    if dims != TOP_SHAPE {
        return Err(SemiHingeError::shape_mismatch(
            format!("upstream gradient {TOP_SHAPE:?}"),
            format!("{dims:?}"),
        ));
    }
    Ok(())
}

/// Reads the upstream gradient back to the host.
pub(crate) fn top_grad_scalar<B: Backend>(top_grad: Tensor<B, 1>) -> SemiHingeResult<f64> {
    check_top_grad(&top_grad)?;
    Ok(top_grad.into_scalar().to_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn both_evaluators_report_scalar_top_shape() {
        let device = Default::default();
        let config = crate::SemiHingeLossConfig::new();

        let sequential = config.init::<TestBackend>(&device).unwrap();
        let parallel = config.init_device::<TestBackend>(&device).unwrap();

        assert_eq!(sequential.top_shape(), [1]);
        assert_eq!(parallel.top_shape(), [1]);
    }

    #[test]
    fn feature_dims_matches_rank() {
        assert_eq!(feature_dims::<3>(&[2, 3, 4]).unwrap(), [2, 3, 4]);
    }

    #[test]
    fn feature_dims_rejects_other_rank() {
        assert!(matches!(
            feature_dims::<2>(&[2, 3, 4]),
            Err(SemiHingeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn top_grad_scalar_reads_value() {
        let device = Default::default();
        let top = Tensor::<TestBackend, 1>::from_data([2.5], &device);
        assert_eq!(top_grad_scalar(top).unwrap(), 2.5);
    }

    #[test]
    fn top_grad_scalar_rejects_non_scalar() {
        let device = Default::default();
        let top = Tensor::<TestBackend, 1>::from_data([1.0, 1.0], &device);
        assert!(matches!(
            top_grad_scalar(top),
            Err(SemiHingeError::ShapeMismatch { .. })
        ));
    }
}
