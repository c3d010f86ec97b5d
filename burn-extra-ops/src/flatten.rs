//! # Axis Flattening
//!
//! Views an N-d tensor as a `[rows, cols]` matrix split at an axis: every dimension before the
//! axis counts towards the rows, every dimension from the axis onwards towards the columns.

use burn::prelude::*;

/// Splits `dims` at `axis` into `[product(dims[..axis]), product(dims[axis..])]`.
///
/// Returns `None` when `axis` is past the last dimension. An empty product is `1`, so
/// `axis == 0` yields a single row and `axis == dims.len()` a single column.
pub fn split_count(dims: &[usize], axis: usize) -> Option<[usize; 2]> {
    if axis > dims.len() {
        return None;
    }
    let (head, tail) = dims.split_at(axis);
    Some([head.iter().product(), tail.iter().product()])
}

/// Reshapes `tensor` to `[rows, cols]` split at `axis`.
///
/// # Panics
///
/// Panics when `axis > D`.
pub fn flatten_at<B: Backend, const D: usize>(tensor: Tensor<B, D>, axis: usize) -> Tensor<B, 2> {
    let dims = tensor.dims();
    let Some(shape) = split_count(&dims, axis) else {
        panic!("Axis {axis} out of range for a tensor of rank {D}");
    };
    tensor.reshape(shape)
}
