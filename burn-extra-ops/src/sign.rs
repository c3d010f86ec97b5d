//! Sign function with a fixed tie-break at zero.

use burn::prelude::*;

/// Element-wise sign returning `+1` for `x >= 0` and `-1` otherwise.
///
/// Unlike [`Tensor::sign`], zero maps to `+1`, which gives the derivative of `|x|` a
/// deterministic value at the kink.
pub fn sign_nonneg<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.greater_equal_elem(0.0)
        .float()
        .mul_scalar(2.0)
        .sub_scalar(1.0)
}
