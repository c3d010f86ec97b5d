//! # Pairwise Squared Euclidean Distance
//!
//! Row-wise difference and squared Euclidean distance between two aligned batches of
//! feature vectors. No square root is taken, so the distance stays differentiable at zero.

use burn::prelude::*;

/// Difference and squared distance of two aligned row batches.
#[derive(Debug, Clone)]
pub struct PairDistance<B: Backend> {
    /// `x0 - x1`, shape `[rows, cols]`.
    pub diff: Tensor<B, 2>,
    /// `sum_j diff[i][j]^2`, shape `[rows]`.
    pub dist: Tensor<B, 1>,
}

/// Computes `x0 - x1` and its per-row squared norm.
///
/// # Shapes
/// - x0: `[rows, cols]`
/// - x1: `[rows, cols]`
///
/// # Panics
///
/// Panics when the two batches differ in shape.
pub fn squared_distance<B: Backend>(x0: Tensor<B, 2>, x1: Tensor<B, 2>) -> PairDistance<B> {
    let dims0 = x0.dims();
    let dims1 = x1.dims();
    assert_eq!(
        dims0, dims1,
        "Shape of x0 ({dims0:?}) must match x1 ({dims1:?})"
    );

    let diff = x0 - x1;
    let dist = diff.clone().powi_scalar(2).sum_dim(1).reshape([dims0[0]]);

    PairDistance { diff, dist }
}
