use burn::{
    nn::{
        LeakyRelu, LeakyReluConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

use crate::pyramid::{FeaturePyramid, FramePyramids};
use crate::upsample::bilinear_upsample;

/// Aligns one frame's pyramid onto the reference frame's pyramid.
pub trait FrameAligner<B: Backend> {
    /// Returns the aligned L1 features, `[batch, nf, height, width]`.
    fn align(&self, neighbor: &FeaturePyramid<B>, reference: &FeaturePyramid<B>) -> Tensor<B, 4>;
}

/// Align every frame of the clip to frame `center` and stack the results.
///
/// The center frame goes through the aligner like any other frame. Output is
/// `[batch, frames, nf, height, width]` in input frame order.
pub fn align_frames<B: Backend, A: FrameAligner<B>>(
    aligner: &A,
    pyramids: &FramePyramids<B>,
    center: usize,
) -> Tensor<B, 5> {
    let reference = pyramids.frame(center);

    let aligned = (0..pyramids.num_frames())
        .map(|i| aligner.align(&pyramids.frame(i), &reference))
        .collect();

    Tensor::stack(aligned, 1)
}

#[derive(Config, Debug)]
pub struct PyramidAlignConfig {
    #[config(default = 64)]
    pub nf: usize,
    /// Channel groups of the feature convolutions; must divide `nf`.
    #[config(default = 8)]
    pub groups: usize,
}

impl PyramidAlignConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PyramidAlign<B> {
        let nf = self.nf;
        let conv = |in_channels, groups| {
            Conv2dConfig::new([in_channels, nf], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_groups(groups)
                .init(device)
        };

        PyramidAlign {
            l3_offset_conv1: conv(2 * nf, 1),
            l3_offset_conv2: conv(nf, 1),
            l3_feature_conv: conv(2 * nf, self.groups),

            l2_offset_conv1: conv(2 * nf, 1),
            l2_offset_conv2: conv(2 * nf, 1),
            l2_offset_conv3: conv(nf, 1),
            l2_feature_conv: conv(2 * nf, self.groups),
            l2_merge_conv: conv(2 * nf, 1),

            l1_offset_conv1: conv(2 * nf, 1),
            l1_offset_conv2: conv(2 * nf, 1),
            l1_offset_conv3: conv(nf, 1),
            l1_feature_conv: conv(2 * nf, self.groups),
            l1_merge_conv: conv(2 * nf, 1),

            cascade_offset_conv1: conv(2 * nf, 1),
            cascade_offset_conv2: conv(nf, 1),
            cascade_feature_conv: conv(2 * nf, self.groups),

            activation: LeakyReluConfig::new().with_negative_slope(0.1).init(),
        }
    }
}

/// Coarse-to-fine pyramid alignment without deformable sampling.
///
/// At each level an offset feature is predicted from the neighbor and
/// reference features, refined with the coarser level's offsets, and used to
/// condition a grouped convolution over the neighbor features. A cascade
/// stage repeats this at L1 against the reference.
#[derive(Module, Debug)]
pub struct PyramidAlign<B: Backend> {
    l3_offset_conv1: Conv2d<B>,
    l3_offset_conv2: Conv2d<B>,
    l3_feature_conv: Conv2d<B>,

    l2_offset_conv1: Conv2d<B>,
    l2_offset_conv2: Conv2d<B>,
    l2_offset_conv3: Conv2d<B>,
    l2_feature_conv: Conv2d<B>,
    l2_merge_conv: Conv2d<B>,

    l1_offset_conv1: Conv2d<B>,
    l1_offset_conv2: Conv2d<B>,
    l1_offset_conv3: Conv2d<B>,
    l1_feature_conv: Conv2d<B>,
    l1_merge_conv: Conv2d<B>,

    cascade_offset_conv1: Conv2d<B>,
    cascade_offset_conv2: Conv2d<B>,
    cascade_feature_conv: Conv2d<B>,

    activation: LeakyRelu,
}

impl<B: Backend> PyramidAlign<B> {
    fn act(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.activation.forward(x)
    }

    /// Offset features for a finer level, given the coarser level's offsets.
    fn refined_offset(
        &self,
        convs: [&Conv2d<B>; 3],
        neighbor: &Tensor<B, 4>,
        reference: &Tensor<B, 4>,
        coarser: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [conv1, conv2, conv3] = convs;
        let offset = self.act(conv1.forward(Tensor::cat(vec![neighbor.clone(), reference.clone()], 1)));
        // Offsets are in pixels, so they double with the resolution.
        let coarser = bilinear_upsample(coarser, 2).mul_scalar(2.0);
        let offset = self.act(conv2.forward(Tensor::cat(vec![offset, coarser], 1)));
        self.act(conv3.forward(offset))
    }
}

impl<B: Backend> FrameAligner<B> for PyramidAlign<B> {
    fn align(&self, neighbor: &FeaturePyramid<B>, reference: &FeaturePyramid<B>) -> Tensor<B, 4> {
        // L3
        let l3_offset = self.act(
            self.l3_offset_conv1
                .forward(Tensor::cat(vec![neighbor.l3.clone(), reference.l3.clone()], 1)),
        );
        let l3_offset = self.act(self.l3_offset_conv2.forward(l3_offset));
        let l3_fea = self.act(
            self.l3_feature_conv
                .forward(Tensor::cat(vec![neighbor.l3.clone(), l3_offset.clone()], 1)),
        );

        // L2
        let l2_offset = self.refined_offset(
            [&self.l2_offset_conv1, &self.l2_offset_conv2, &self.l2_offset_conv3],
            &neighbor.l2,
            &reference.l2,
            l3_offset,
        );
        let l2_fea = self.l2_feature_conv
            .forward(Tensor::cat(vec![neighbor.l2.clone(), l2_offset.clone()], 1));
        let l2_fea = self.act(
            self.l2_merge_conv
                .forward(Tensor::cat(vec![l2_fea, bilinear_upsample(l3_fea, 2)], 1)),
        );

        // L1
        let l1_offset = self.refined_offset(
            [&self.l1_offset_conv1, &self.l1_offset_conv2, &self.l1_offset_conv3],
            &neighbor.l1,
            &reference.l1,
            l2_offset,
        );
        let l1_fea = self.l1_feature_conv
            .forward(Tensor::cat(vec![neighbor.l1.clone(), l1_offset], 1));
        let l1_fea = self
            .l1_merge_conv
            .forward(Tensor::cat(vec![l1_fea, bilinear_upsample(l2_fea, 2)], 1));

        // Cascade
        let offset = self.act(
            self.cascade_offset_conv1
                .forward(Tensor::cat(vec![l1_fea.clone(), reference.l1.clone()], 1)),
        );
        let offset = self.act(self.cascade_offset_conv2.forward(offset));
        self.act(
            self.cascade_feature_conv
                .forward(Tensor::cat(vec![l1_fea, offset], 1)),
        )
    }
}
