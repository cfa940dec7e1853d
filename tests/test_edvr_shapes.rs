use burn::backend::ndarray::NdArrayDevice;
use burn::tensor::{Distribution, Tensor};
use edvr_rust::{EdvrConfig, EdvrError, device::CpuBackend};
use std::sync::OnceLock;

/// End-to-end shape checks of the full network on the CPU backend.

type TestBackend = CpuBackend;

static DEVICE: OnceLock<NdArrayDevice> = OnceLock::new();

fn get_device() -> &'static NdArrayDevice {
    DEVICE.get_or_init(NdArrayDevice::default)
}

/// Narrow network; the output shape does not depend on the feature width.
fn narrow_config(nframes: usize, scale: usize) -> EdvrConfig {
    EdvrConfig::new()
        .with_nf(16)
        .with_nframes(nframes)
        .with_scale(scale)
        .with_front_rbs(2)
        .with_back_rbs(2)
}

fn random_clip(dims: [usize; 5]) -> Tensor<TestBackend, 5> {
    Tensor::random(dims, Distribution::Uniform(0.0, 1.0), get_device())
}

#[test]
fn test_five_frames_64x64_at_4x() {
    let model = narrow_config(5, 4)
        .init::<TestBackend>(get_device())
        .expect("scale 4 is supported");

    let out = model.forward(random_clip([1, 5, 3, 64, 64])).expect("forward");
    assert_eq!(out.dims(), [1, 3, 256, 256]);
}

#[test]
fn test_three_frames_32x48_at_2x() {
    let model = narrow_config(3, 2)
        .init::<TestBackend>(get_device())
        .expect("scale 2 is supported");

    let out = model.forward(random_clip([2, 3, 3, 32, 48])).expect("forward");
    assert_eq!(out.dims(), [2, 3, 64, 96]);
}

#[test]
fn test_every_supported_scale_multiplies_spatial_dims() {
    for scale in [2, 3, 4] {
        let model = narrow_config(3, scale)
            .init::<TestBackend>(get_device())
            .expect("supported scale");
        assert_eq!(model.scale(), scale);

        let out = model.forward(random_clip([1, 3, 3, 16, 20])).expect("forward");
        assert_eq!(out.dims(), [1, 3, 16 * scale, 20 * scale]);
    }
}

#[test]
fn test_output_has_three_channels_for_any_width() {
    for nf in [4, 8, 24] {
        let model = narrow_config(3, 2)
            .with_nf(nf)
            .with_groups(4)
            .init::<TestBackend>(get_device())
            .expect("supported scale");

        let out = model.forward(random_clip([1, 3, 3, 8, 8])).expect("forward");
        assert_eq!(out.dims()[1], 3);
    }
}

#[test]
fn test_unsupported_scales_are_rejected() {
    for scale in [0, 1, 5, 8, 16] {
        let result = narrow_config(5, scale).init::<TestBackend>(get_device());
        match result {
            Err(EdvrError::UnsupportedScale { scale: s }) => assert_eq!(s, scale),
            Ok(_) => panic!("scale {scale} should be rejected"),
        }
    }
}

#[test]
fn test_output_is_finite() {
    let model = narrow_config(3, 3)
        .init::<TestBackend>(get_device())
        .expect("scale 3 is supported");

    let out = model.forward(random_clip([1, 3, 3, 12, 12])).expect("forward");
    let max = out.abs().max().into_scalar();
    assert!(max.is_finite(), "output must be finite, got {max}");
}
