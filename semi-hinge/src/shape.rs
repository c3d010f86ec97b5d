//! Shape binding for the four layer inputs.

use burn_extra_ops::split_count;

use crate::error::{SemiHingeError, SemiHingeResult};

/// Shape of the scalar loss output.
pub const TOP_SHAPE: [usize; 1] = [1];

/// Shapes of the four bottom inputs, in layer order.
#[derive(Debug, Clone, Copy)]
pub struct BottomShapes<'a> {
    pub x0: &'a [usize],
    pub x1: &'a [usize],
    pub label0: &'a [usize],
    pub label1: &'a [usize],
}

/// Sample count and feature width derived from the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairShape {
    /// Number of sample pairs `N`.
    pub num: usize,
    /// Flattened feature width `W`.
    pub width: usize,
}

impl PairShape {
    /// Validates the bottom shapes and derives `(N, W)` with the feature split at `axis`.
    ///
    /// # Errors
    ///
    /// - [`SemiHingeError::ShapeMismatch`] if `x0` and `x1` differ, if `axis` exceeds the feature
    ///   rank, if the feature width is zero, if the label shapes differ, or if the label count
    ///   differs from `N`.
    /// - [`SemiHingeError::EmptyBatch`] if `N` is zero.
    pub fn bind(shapes: &BottomShapes<'_>, axis: usize) -> SemiHingeResult<Self> {
        if shapes.x0 != shapes.x1 {
            return Err(SemiHingeError::shape_mismatch(
                format!("x1 shaped like x0 {:?}", shapes.x0),
                format!("{:?}", shapes.x1),
            ));
        }

        let [num, width] = split_count(shapes.x0, axis).ok_or_else(|| {
            SemiHingeError::shape_mismatch(
                format!("features of rank >= {axis}"),
                format!("{:?}", shapes.x0),
            )
        })?;

        if shapes.label0 != shapes.label1 {
            return Err(SemiHingeError::shape_mismatch(
                format!("label1 shaped like label0 {:?}", shapes.label0),
                format!("{:?}", shapes.label1),
            ));
        }

        let labels: usize = shapes.label0.iter().product();
        if labels != num {
            return Err(SemiHingeError::shape_mismatch(
                format!("{num} labels per side"),
                format!("{labels} labels {:?}", shapes.label0),
            ));
        }

        if num == 0 {
            return Err(SemiHingeError::EmptyBatch);
        }
        if width == 0 {
            return Err(SemiHingeError::shape_mismatch(
                "a non-zero feature width",
                format!("{:?} split at axis {axis}", shapes.x0),
            ));
        }

        Ok(Self { num, width })
    }

    /// Number of elements in one feature input.
    pub const fn len(&self) -> usize {
        self.num * self.width
    }

    /// Whether the shape holds no elements. Never true for a bound shape.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `2N` divisor of the total loss.
    pub fn normalizer(&self) -> f64 {
        2.0 * self.num as f64
    }
}
