//! Compile-time backend choice for the `semi_hinge` driver.
//!
//! `check` and `fit` are generic over the backend; the binary instantiates them with
//! [`SelectedBackend`]. The `cuda` feature wins over `wgpu`, and both fall back to ndarray.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Backend the loss layers run on.
        pub type SelectedBackend = Cuda;
        pub type SelectedDevice = CudaDevice;

        const BACKEND_NAME: &str = "CUDA (NVIDIA GPU)";

        /// First CUDA device.
        pub fn create_device() -> SelectedDevice {
            CudaDevice::default()
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Backend the loss layers run on.
        pub type SelectedBackend = Wgpu;
        pub type SelectedDevice = WgpuDevice;

        const BACKEND_NAME: &str = "WGPU (GPU)";

        /// Default adapter chosen by wgpu.
        pub fn create_device() -> SelectedDevice {
            WgpuDevice::default()
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Backend the loss layers run on.
        pub type SelectedBackend = NdArray;
        pub type SelectedDevice = NdArrayDevice;

        const BACKEND_NAME: &str = "NdArray (CPU)";

        /// The host CPU.
        pub fn create_device() -> SelectedDevice {
            NdArrayDevice::default()
        }
    }
}

/// Human-readable backend name, printed by `info` and logged at startup.
pub const fn get_backend_name() -> &'static str {
    BACKEND_NAME
}

#[cfg(all(test, not(any(feature = "cuda", feature = "wgpu"))))]
mod tests {
    use super::*;
    use burn::prelude::*;
    use semi_hinge_loss::{LossLayer, SemiHingeLossConfig};

    #[test]
    fn default_build_runs_layers_on_cpu() {
        assert_eq!(get_backend_name(), "NdArray (CPU)");

        let device = create_device();
        let mut loss = SemiHingeLossConfig::new()
            .init_device::<SelectedBackend>(&device)
            .unwrap();
        let value = loss
            .forward(
                Tensor::<SelectedBackend, 2>::ones([2, 3], &device),
                Tensor::<SelectedBackend, 2>::ones([2, 3], &device),
                Tensor::<SelectedBackend, 1, Int>::zeros([2], &device),
                Tensor::<SelectedBackend, 1, Int>::zeros([2], &device),
            )
            .unwrap();

        assert_eq!(value.dims(), [1]);
    }
}
