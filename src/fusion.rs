use burn::{
    nn::{
        LeakyRelu, LeakyReluConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::pyramid::select_frame;

/// Combines the aligned features of all frames into one feature map.
pub trait FeatureFusion<B: Backend> {
    /// `[batch, frames, nf, h, w]` to `[batch, nf, h, w]`.
    fn fuse(&self, aligned: Tensor<B, 5>) -> Tensor<B, 4>;
}

#[derive(Config, Debug)]
pub struct TemporalAttentionFusionConfig {
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 5)]
    pub nframes: usize,
    #[config(default = 2)]
    pub center: usize,
}

impl TemporalAttentionFusionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TemporalAttentionFusion<B> {
        let nf = self.nf;
        let embed = || {
            Conv2dConfig::new([nf, nf], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        TemporalAttentionFusion {
            embed_neighbor: embed(),
            embed_center: embed(),
            fusion: Conv2dConfig::new([self.nframes * nf, nf], [1, 1]).init(device),
            activation: LeakyReluConfig::new().with_negative_slope(0.1).init(),
            center: self.center,
        }
    }
}

/// Temporal attention fusion.
///
/// Each frame is weighted per pixel by `sigmoid(<emb_i, emb_center>)`, the
/// channel-wise dot product of its embedding with the center frame's
/// embedding, before a 1x1 convolution merges all frames.
#[derive(Module, Debug)]
pub struct TemporalAttentionFusion<B: Backend> {
    embed_neighbor: Conv2d<B>,
    embed_center: Conv2d<B>,
    fusion: Conv2d<B>,
    activation: LeakyRelu,
    center: usize,
}

impl<B: Backend> TemporalAttentionFusion<B> {
    pub fn center(&self) -> usize {
        self.center
    }

    /// Per-frame attention maps, `[batch, frames, 1, h, w]`, values in (0, 1).
    pub fn attention(&self, aligned: Tensor<B, 5>) -> Tensor<B, 5> {
        let [batch, num_frames, nf, height, width] = aligned.dims();

        let center = self.embed_center.forward(select_frame(&aligned, self.center));
        let neighbors = self
            .embed_neighbor
            .forward(aligned.reshape([batch * num_frames, nf, height, width]))
            .reshape([batch, num_frames, nf, height, width]);

        let center = center
            .unsqueeze_dim::<5>(1)
            .expand([batch, num_frames, nf, height, width]);
        let correlation = (neighbors * center).sum_dim(2);
        sigmoid(correlation)
    }
}

impl<B: Backend> FeatureFusion<B> for TemporalAttentionFusion<B> {
    fn fuse(&self, aligned: Tensor<B, 5>) -> Tensor<B, 4> {
        let [batch, num_frames, nf, height, width] = aligned.dims();

        let weights = self
            .attention(aligned.clone())
            .expand([batch, num_frames, nf, height, width]);
        let weighted = aligned * weights;
        let stacked = weighted.reshape([batch, num_frames * nf, height, width]);

        self.activation.forward(self.fusion.forward(stacked))
    }
}
