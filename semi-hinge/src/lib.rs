//! Semi-supervised pairwise hinge loss for embedding training.
//!
//! Each sample is a pair of feature vectors `(x0, x1)` with one optional class label per
//! side. With `D` the squared Euclidean distance of the pair and `N` the number of pairs:
//!
//! - both labels present: `max(0, sup_bias - y * (sup_thre - D))`, with `y = +1` for equal
//!   labels and `-1` otherwise;
//! - at least one label equal to `ignore_label`:
//!   `gamma * max(0, unsup_bias - |unsup_thre - D|)`.
//!
//! The total loss is the sum of the per-sample terms divided by `2N`. Backward produces exact
//! analytic gradients for both feature inputs; labels never receive gradients.
//!
//! Two evaluators implement the [`LossLayer`] interface:
//!
//! - [`SemiHingeLoss`] evaluates sample by sample on the host in `f64`;
//! - [`DeviceSemiHingeLoss`] evaluates with batched tensor operations on any Burn backend.
//!
//! ## Usage Example
//!
//! ```rust
//! use burn::backend::NdArray;
//! use burn::prelude::*;
//! use semi_hinge_loss::{LossLayer, SemiHingeLossConfig};
//!
//! let device = Default::default();
//! let mut loss = SemiHingeLossConfig::new()
//!     .with_sup_thre(2.0)
//!     .init::<NdArray>(&device)
//!     .expect("valid configuration");
//!
//! let x0 = Tensor::<NdArray, 2>::from_data([[1.0, 0.0]], &device);
//! let x1 = Tensor::<NdArray, 2>::from_data([[0.0, 0.0]], &device);
//! let label0 = Tensor::<NdArray, 1, Int>::from_data([5], &device);
//! let label1 = Tensor::<NdArray, 1, Int>::from_data([5], &device);
//!
//! let value = loss.forward(x0, x1, label0, label1).expect("consistent shapes");
//! let grads = loss
//!     .backward::<2>(Tensor::ones([1], &device), [true, true, false, false])
//!     .expect("forward ran");
//! assert_eq!(value.into_scalar(), 0.0);
//! assert!(grads.x0.is_some());
//! ```

mod config;
mod device;
mod error;
mod layer;
mod regime;
mod sequential;
mod shape;


pub use config::SemiHingeLossConfig;
pub use device::DeviceSemiHingeLoss;
pub use error::{SemiHingeError, SemiHingeResult};
pub use layer::{LossLayer, PairGradients, LABEL0, LABEL1, X0, X1};
pub use regime::{HingeTerm, SampleRegime};
pub use sequential::{ForwardStats, SemiHingeLoss};
pub use shape::{BottomShapes, PairShape, TOP_SHAPE};
