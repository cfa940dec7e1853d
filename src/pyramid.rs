use burn::{
    nn::{
        LeakyRelu, LeakyReluConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

use crate::residual_block::ResidualStack;

/// Three-level feature pyramid of a single frame.
///
/// `l1` is full resolution, `l2` half, `l3` quarter.
#[derive(Debug, Clone)]
pub struct FeaturePyramid<B: Backend> {
    pub l1: Tensor<B, 4>,
    pub l2: Tensor<B, 4>,
    pub l3: Tensor<B, 4>,
}

/// Feature pyramids of every frame in a clip, shaped `[batch, frames, nf, h, w]`.
#[derive(Debug, Clone)]
pub struct FramePyramids<B: Backend> {
    pub l1: Tensor<B, 5>,
    pub l2: Tensor<B, 5>,
    pub l3: Tensor<B, 5>,
}

impl<B: Backend> FramePyramids<B> {
    pub fn num_frames(&self) -> usize {
        self.l1.dims()[1]
    }

    /// Pyramid of frame `index`.
    pub fn frame(&self, index: usize) -> FeaturePyramid<B> {
        FeaturePyramid {
            l1: select_frame(&self.l1, index),
            l2: select_frame(&self.l2, index),
            l3: select_frame(&self.l3, index),
        }
    }
}

/// Take frame `index` out of a `[batch, frames, c, h, w]` tensor.
pub fn select_frame<B: Backend>(x: &Tensor<B, 5>, index: usize) -> Tensor<B, 4> {
    let [batch, _, channels, height, width] = x.dims();
    x.clone()
        .slice([0..batch, index..index + 1, 0..channels, 0..height, 0..width])
        .squeeze::<4>(1)
}

#[derive(Config, Debug)]
pub struct FeatureExtractorConfig {
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 5)]
    pub num_blocks: usize,
}

impl FeatureExtractorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureExtractor<B> {
        let nf = self.nf;
        let conv = |in_channels, stride| {
            Conv2dConfig::new([in_channels, nf], [3, 3])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        FeatureExtractor {
            conv_first: conv(3, 1),
            residual: ResidualStack::new(nf, self.num_blocks, device),
            l2_conv1: conv(nf, 2),
            l2_conv2: conv(nf, 1),
            l3_conv1: conv(nf, 2),
            l3_conv2: conv(nf, 1),
            activation: LeakyReluConfig::new().with_negative_slope(0.1).init(),
        }
    }
}

/// Shared-weight stem turning RGB frames into a three-level pyramid.
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    conv_first: Conv2d<B>,
    residual: ResidualStack<B>,
    l2_conv1: Conv2d<B>,
    l2_conv2: Conv2d<B>,
    l3_conv1: Conv2d<B>,
    l3_conv2: Conv2d<B>,
    activation: LeakyRelu,
}

impl<B: Backend> FeatureExtractor<B> {
    /// # Shapes
    ///   - Frames [batch, frames, 3, height, width], height and width divisible by 4
    ///   - Output levels [batch, frames, nf, height / s, width / s] for s in {1, 2, 4}
    pub fn forward(&self, frames: Tensor<B, 5>) -> FramePyramids<B> {
        let [batch, num_frames, channels, height, width] = frames.dims();
        let x = frames.reshape([batch * num_frames, channels, height, width]);

        let l1 = self.activation.forward(self.conv_first.forward(x));
        let l1 = self.residual.forward(l1);

        let l2 = self.activation.forward(self.l2_conv1.forward(l1.clone()));
        let l2 = self.activation.forward(self.l2_conv2.forward(l2));

        let l3 = self.activation.forward(self.l3_conv1.forward(l2.clone()));
        let l3 = self.activation.forward(self.l3_conv2.forward(l3));

        FramePyramids {
            l1: unflatten_frames(l1, batch, num_frames),
            l2: unflatten_frames(l2, batch, num_frames),
            l3: unflatten_frames(l3, batch, num_frames),
        }
    }
}

fn unflatten_frames<B: Backend>(x: Tensor<B, 4>, batch: usize, num_frames: usize) -> Tensor<B, 5> {
    let [_, channels, height, width] = x.dims();
    x.reshape([batch, num_frames, channels, height, width])
}
