//! Semi-supervised hinge loss demos
//!
//! This crate provides a small driver around the semi-supervised hinge loss layer,
//! used to verify gradients and to watch the loss shape a set of embeddings.
//!
//! ## Available Commands
//!
//! - `check`: compare the sequential and device evaluators and run a finite-difference check
//! - `fit`: gradient descent on free embedding pairs using the layer's backward pass
//! - `info`: show the selected backend and the effective configuration
//!
//! ## Usage
//!
//! ```bash
//! # Gradient check with default settings
//! cargo run --bin semi_hinge -- check
//!
//! # Fit with a configuration file on the WGPU backend
//! cargo run --bin semi_hinge --features wgpu --no-default-features -- fit --config demo.json
//! ```

pub mod batch;
pub mod check;
pub mod common;
pub mod config;
pub mod fit;

// Re-export commonly used items
pub use batch::PairBatch;
pub use check::{run_check, CheckReport};
pub use common::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use config::{BatchConfig, DemoConfig};
pub use fit::{run_fit, FitReport};

/// Propagation mask requesting gradients for both feature inputs only.
pub const FEATURES_ONLY: [bool; 4] = [true, true, false, false];
