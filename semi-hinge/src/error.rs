use thiserror::Error;

/// The error type for semi-supervised hinge loss operations.
///
/// Every variant is a caller-side precondition violation. None of them is transient, so
/// callers should not retry the failed call with the same inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemiHingeError {
    /// A configuration parameter is outside its valid range.
    #[error("invalid configuration parameter '{parameter}': {reason}")]
    InvalidConfiguration {
        /// The name of the offending parameter.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The input tensor shapes are inconsistent with each other or with the last forward pass.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The shape that was required.
        expected: String,
        /// The shape that was supplied.
        actual: String,
    },

    /// The inputs contain no samples.
    #[error("empty batch: at least one sample pair is required")]
    EmptyBatch,

    /// `backward` was called before any successful `forward`.
    #[error("backward called before forward: no cached distances are available")]
    BackwardBeforeForward,

    /// Tensor contents could not be read back to the host.
    #[error("invalid tensor data: {reason}")]
    InvalidTensorData {
        /// The underlying data error.
        reason: String,
    },
}

impl SemiHingeError {
    pub(crate) fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for semi-supervised hinge loss operations.
pub type SemiHingeResult<T> = Result<T, SemiHingeError>;
