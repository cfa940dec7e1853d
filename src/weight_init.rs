use burn::{
    module::Param,
    nn::{
        Initializer,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

/// Build a convolution with Kaiming-normal weights (fan-in, ReLU gain)
/// multiplied by `scale`, and a zeroed bias.
///
/// Weights are drawn from `N(0, scale * sqrt(2 / fan_in))`.
pub fn scaled_kaiming_conv2d<B: Backend>(
    config: Conv2dConfig,
    scale: f64,
    device: &B::Device,
) -> Conv2d<B> {
    let mut conv = config
        .with_initializer(Initializer::KaimingNormal {
            gain: std::f64::consts::SQRT_2 * scale,
            fan_out_only: false,
        })
        .init(device);

    conv.bias = conv
        .bias
        .map(|bias| Param::from_tensor(bias.val().zeros_like()));

    conv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CpuBackend;
    use burn::backend::ndarray::NdArrayDevice;

    #[test]
    fn test_scaled_kaiming_statistics() {
        let device = NdArrayDevice::default();
        let channels = 64;
        let conv: Conv2d<CpuBackend> =
            scaled_kaiming_conv2d(Conv2dConfig::new([channels, channels], [3, 3]), 0.1, &device);

        let weight = conv.weight.val();
        let fan_in = (channels * 9) as f32;
        let expected_std = 0.1 * (2.0 / fan_in).sqrt();

        let mean = weight.clone().mean().into_scalar();
        let var = (weight.clone() - mean).powf_scalar(2.0).mean().into_scalar();
        let std = var.sqrt();

        assert!(mean.abs() < expected_std * 0.05, "mean too far from zero: {mean}");
        assert!(
            (std - expected_std).abs() < expected_std * 0.1,
            "std {std} vs expected {expected_std}"
        );
    }

    #[test]
    fn test_bias_is_zeroed() {
        let device = NdArrayDevice::default();
        let conv: Conv2d<CpuBackend> =
            scaled_kaiming_conv2d(Conv2dConfig::new([8, 8], [3, 3]), 0.1, &device);

        let bias = conv.bias.expect("bias enabled by default").val();
        assert_eq!(bias.dims(), [8]);
        assert_eq!(bias.abs().sum().into_scalar(), 0.0);
    }
}
