//! Common utilities for the demos.
//!
//! Backend selection is driven by cargo features: `cuda`, then `wgpu`, falling back to
//! the ndarray CPU backend.

mod backend;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
