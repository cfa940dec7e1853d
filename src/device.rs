//! Centralized device initialization for EDVR
//!
//! Binaries run on the WGPU backend; tests and CPU-only hosts use NdArray.

use burn::backend::{wgpu::WgpuDevice, NdArray, Wgpu};
use std::sync::OnceLock;

/// Global device instance to avoid "Client already created" conflicts
static DEVICE: OnceLock<WgpuDevice> = OnceLock::new();

/// Initialize the WGPU device once and hand out clones of it.
///
/// # Example
/// ```no_run
/// use edvr_rust::device::init_device;
///
/// let device = init_device();
/// ```
pub fn init_device() -> WgpuDevice {
    DEVICE
        .get_or_init(|| {
            let device = WgpuDevice::default();
            log::info!("WGPU device initialized: {device:?}");
            device
        })
        .clone()
}

/// Type alias for the Wgpu backend used by the binaries
pub type Backend = Wgpu<f32, i32>;

/// CPU backend, used by the test suite
pub type CpuBackend = NdArray<f32>;

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::tensor::Tensor;

    #[test]
    fn test_cpu_backend_video_tensor() {
        let device = NdArrayDevice::default();

        // [batch, frames, channels, height, width]
        let frames = Tensor::<CpuBackend, 5>::zeros([1, 3, 3, 4, 4], &device);
        assert_eq!(frames.dims(), [1, 3, 3, 4, 4]);

        let flat = frames.reshape([3, 3, 4, 4]);
        assert_eq!(flat.dims(), [3, 3, 4, 4]);
    }
}
