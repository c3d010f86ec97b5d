//! Additional operations for the Burn deep learning framework
//!
//! This crate provides the tensor operations needed by pairwise distance losses that are
//! not available as single calls in the core Burn framework.

use burn::prelude::*;

mod flatten;
mod pairwise;
mod sign;

// Convenient re-exports
pub use flatten::{flatten_at, split_count};
pub use pairwise::{squared_distance, PairDistance};
pub use sign::sign_nonneg;

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend, const D: usize> {
    /// Collapse the dimensions before `axis` into rows and the rest into columns.
    fn flatten_at(self, axis: usize) -> Tensor<B, 2>;

    /// Element-wise sign where zero maps to `+1`.
    fn sign_nonneg(self) -> Self;
}

impl<B: Backend, const D: usize> TensorExtraOps<B, D> for Tensor<B, D> {
    fn flatten_at(self, axis: usize) -> Tensor<B, 2> {
        flatten_at(self, axis)
    }

    fn sign_nonneg(self) -> Self {
        sign_nonneg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArray, Autodiff},
        tensor::{Tensor, TensorData},
    };

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_tensor_extra_ops() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::random(
            [2, 3, 4, 5],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let flat = tensor.clone().flatten_at(2);
        assert_eq!(flat.dims(), [6, 20]);

        let signs = tensor.sign_nonneg();
        assert_eq!(signs.dims(), [2, 3, 4, 5]);
    }

    #[test]
    fn test_sign_nonneg_through_trait() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 1>::from_data(TensorData::from([0.0, -2.0]), &device);

        let signs = tensor.sign_nonneg().into_data();
        signs.assert_eq(&TensorData::from([1.0f32, -1.0]), false);
    }
}
