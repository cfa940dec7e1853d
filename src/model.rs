use burn::prelude::*;

use crate::{
    align::{PyramidAlign, PyramidAlignConfig, align_frames},
    error,
    fusion::{FeatureFusion, TemporalAttentionFusion, TemporalAttentionFusionConfig},
    pyramid::{FeatureExtractor, FeatureExtractorConfig, select_frame},
    residual_block::ResidualStack,
    upsample::{Upsampler, UpsamplerConfig},
};

#[derive(Config, Debug)]
pub struct EdvrConfig {
    /// Feature channels.
    #[config(default = 64)]
    pub nf: usize,
    /// Input frames per clip; odd so the center frame is well defined.
    #[config(default = 5)]
    pub nframes: usize,
    /// Upsampling factor, one of 2, 3 or 4.
    #[config(default = 4)]
    pub scale: usize,
    /// Channel groups used by the aligner.
    #[config(default = 8)]
    pub groups: usize,
    /// Residual blocks in the feature extractor.
    #[config(default = 5)]
    pub front_rbs: usize,
    /// Residual blocks in the reconstruction trunk.
    #[config(default = 10)]
    pub back_rbs: usize,
}

impl EdvrConfig {
    pub fn center(&self) -> usize {
        self.nframes / 2
    }

    /// Returns the initialized model, or `UnsupportedScale` for a scale
    /// outside {2, 3, 4}.
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<Edvr<B>> {
        let upsampler = UpsamplerConfig::new()
            .with_nf(self.nf)
            .with_scale(self.scale)
            .init(device)?;

        let model = Edvr {
            extractor: FeatureExtractorConfig::new()
                .with_nf(self.nf)
                .with_num_blocks(self.front_rbs)
                .init(device),
            aligner: PyramidAlignConfig::new()
                .with_nf(self.nf)
                .with_groups(self.groups)
                .init(device),
            fusion: TemporalAttentionFusionConfig::new()
                .with_nf(self.nf)
                .with_nframes(self.nframes)
                .with_center(self.center())
                .init(device),
            recon_trunk: ResidualStack::new(self.nf, self.back_rbs, device),
            upsampler,
            center: self.center(),
        };

        log::info!(
            "EDVR initialized: nf={}, nframes={}, scale={}x, {} parameters",
            self.nf,
            self.nframes,
            self.scale,
            model.num_params()
        );

        Ok(model)
    }
}

/// Video super-resolution network reconstructing the center frame of a clip.
#[derive(Module, Debug)]
pub struct Edvr<B: Backend> {
    extractor: FeatureExtractor<B>,
    aligner: PyramidAlign<B>,
    fusion: TemporalAttentionFusion<B>,
    recon_trunk: ResidualStack<B>,
    pub(crate) upsampler: Upsampler<B>,
    center: usize,
}

impl<B: Backend> Edvr<B> {
    pub fn center(&self) -> usize {
        self.center
    }

    pub fn scale(&self) -> usize {
        self.upsampler.scale()
    }

    /// # Shapes
    ///   - Frames [batch, frames, 3, height, width], height and width divisible by 4
    ///   - Output [batch, 3, height * scale, width * scale]
    pub fn forward(&self, frames: Tensor<B, 5>) -> error::Result<Tensor<B, 4>> {
        let center_frame = select_frame(&frames, self.center);

        let pyramids = self.extractor.forward(frames);
        log::debug!(
            "pyramid levels: {:?} {:?} {:?}",
            pyramids.l1.dims(),
            pyramids.l2.dims(),
            pyramids.l3.dims()
        );

        let aligned = align_frames(&self.aligner, &pyramids, self.center);
        log::debug!("aligned features: {:?}", aligned.dims());

        let fused = self.fusion.fuse(aligned);
        let fea = self.recon_trunk.forward(fused);

        let out = self.upsampler.forward(fea, center_frame)?;
        log::debug!("reconstruction: {:?}", out.dims());

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CpuBackend;
    use crate::error::EdvrError;
    use crate::upsample::bilinear_upsample;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::module::Param;
    use burn::tensor::Distribution;

    fn small_config() -> EdvrConfig {
        EdvrConfig::new()
            .with_nf(8)
            .with_nframes(3)
            .with_groups(4)
            .with_front_rbs(1)
            .with_back_rbs(1)
    }

    #[test]
    fn test_default_config() {
        let config = EdvrConfig::new();
        assert_eq!(config.nf, 64);
        assert_eq!(config.nframes, 5);
        assert_eq!(config.scale, 4);
        assert_eq!(config.groups, 8);
        assert_eq!(config.front_rbs, 5);
        assert_eq!(config.back_rbs, 10);
        assert_eq!(config.center(), 2);
    }

    #[test]
    fn test_center_is_middle_frame() {
        let device = NdArrayDevice::default();
        for (nframes, center) in [(1, 0), (3, 1), (5, 2), (7, 3)] {
            let model = small_config()
                .with_nframes(nframes)
                .with_scale(2)
                .init::<CpuBackend>(&device)
                .expect("supported scale");
            assert_eq!(model.center(), center);
        }
    }

    #[test]
    fn test_unsupported_scale_fails_at_init() {
        let device = NdArrayDevice::default();
        for scale in [0, 1, 5, 6, 8] {
            let err = small_config()
                .with_scale(scale)
                .init::<CpuBackend>(&device)
                .unwrap_err();
            assert_eq!(err, EdvrError::UnsupportedScale { scale });
        }
    }

    #[test]
    fn test_zeroed_output_conv_returns_bilinear_baseline() {
        let device = NdArrayDevice::default();
        let mut model = small_config()
            .with_scale(2)
            .init::<CpuBackend>(&device)
            .expect("supported scale");

        let output = &mut model.upsampler.output;
        output.weight = Param::from_tensor(output.weight.val().zeros_like());
        output.bias = output
            .bias
            .take()
            .map(|bias| Param::from_tensor(bias.val().zeros_like()));

        let frames = Tensor::<CpuBackend, 5>::random(
            [1, 3, 3, 8, 8],
            Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let baseline = bilinear_upsample(select_frame(&frames, 1), 2);
        let out = model.forward(frames).expect("supported scale");

        assert_eq!(out.dims(), [1, 3, 16, 16]);
        let diff = (out - baseline).abs().max().into_scalar();
        assert!(diff < 1e-5, "max abs diff {diff}");
    }

    #[test]
    fn test_forward_rechecks_scale() {
        let device = NdArrayDevice::default();
        let mut model = small_config()
            .with_scale(3)
            .init::<CpuBackend>(&device)
            .expect("supported scale");
        model.upsampler.scale = 7;

        let frames = Tensor::<CpuBackend, 5>::zeros([1, 3, 3, 4, 4], &device);
        assert_eq!(
            model.forward(frames).unwrap_err(),
            EdvrError::UnsupportedScale { scale: 7 }
        );
    }
}
