//! Pixel-shuffle reconstruction head and the bilinear baseline it refines.
//!
//! The head predicts a residual image; the final output is that residual
//! added to a bilinear upsample of the center input frame.

use burn::{
    nn::{
        LeakyRelu, LeakyReluConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
    tensor::TensorData,
};

use crate::error::{self, EdvrError};

/// Expansion stage for one upsampling factor: `rounds` passes of
/// (conv to `shuffle² · nf` channels, pixel-shuffle by `shuffle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPlan {
    pub rounds: usize,
    pub shuffle: usize,
}

impl ExpansionPlan {
    pub fn for_scale(scale: usize) -> error::Result<Self> {
        match scale {
            4 => Ok(Self { rounds: 2, shuffle: 2 }),
            3 => Ok(Self { rounds: 1, shuffle: 3 }),
            2 => Ok(Self { rounds: 1, shuffle: 2 }),
            _ => Err(EdvrError::UnsupportedScale { scale }),
        }
    }
}

/// Rearrange `[b, c·r², h, w]` into `[b, c, h·r, w·r]`.
///
/// Output pixel `(y·r + dy, x·r + dx)` of channel `c` comes from input
/// channel `c·r² + dy·r + dx`.
pub fn pixel_shuffle<B: Backend>(x: Tensor<B, 4>, factor: usize) -> Tensor<B, 4> {
    let [batch, channels, height, width] = x.dims();
    let out_channels = channels / (factor * factor);

    x.reshape([batch, out_channels, factor, factor, height, width])
        .permute([0, 1, 4, 2, 5, 3])
        .reshape([batch, out_channels, height * factor, width * factor])
}

/// Row-major `[len · scale, len]` interpolation matrix for one axis.
///
/// Half-pixel centers (`align_corners = false`); sources left of the first
/// pixel clamp to it, sources past the last pixel reuse it.
pub fn bilinear_weights(len: usize, scale: usize) -> Vec<f32> {
    let out_len = len * scale;
    let mut weights = vec![0.0f32; out_len * len];

    for out in 0..out_len {
        let src = ((out as f32 + 0.5) / scale as f32 - 0.5).max(0.0);
        let i0 = (src.floor() as usize).min(len - 1);
        let i1 = (i0 + 1).min(len - 1);
        let lambda = src - i0 as f32;

        weights[out * len + i0] += 1.0 - lambda;
        weights[out * len + i1] += lambda;
    }

    weights
}

fn weight_matrix<B: Backend>(len: usize, scale: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(bilinear_weights(len, scale), [len * scale, len]), device)
}

/// Bilinear upsample of `[b, c, h, w]` by an integer factor.
///
/// Computed as `Wh · x · Wwᵀ` per channel, so it stays differentiable on any
/// backend.
pub fn bilinear_upsample<B: Backend>(x: Tensor<B, 4>, scale: usize) -> Tensor<B, 4> {
    let [batch, channels, height, width] = x.dims();
    let device = x.device();
    let planes = batch * channels;
    let (out_h, out_w) = (height * scale, width * scale);

    let rows = weight_matrix::<B>(height, scale, &device)
        .unsqueeze::<3>()
        .expand([planes, out_h, height]);
    let cols = weight_matrix::<B>(width, scale, &device)
        .transpose()
        .unsqueeze::<3>()
        .expand([planes, width, out_w]);

    let x = x.reshape([planes, height, width]);
    rows.matmul(x)
        .matmul(cols)
        .reshape([batch, channels, out_h, out_w])
}

#[derive(Config, Debug)]
pub struct UpsamplerConfig {
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 4)]
    pub scale: usize,
}

impl UpsamplerConfig {
    /// Fails with [`EdvrError::UnsupportedScale`] unless `scale` is 2, 3 or 4.
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<Upsampler<B>> {
        let plan = ExpansionPlan::for_scale(self.scale)?;
        let nf = self.nf;
        let conv = |out_channels| {
            Conv2dConfig::new([nf, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        let expand = (0..plan.rounds)
            .map(|_| conv(nf * plan.shuffle * plan.shuffle))
            .collect();

        Ok(Upsampler {
            expand,
            refine: conv(nf),
            output: conv(3),
            activation: LeakyReluConfig::new().with_negative_slope(0.1).init(),
            shuffle: plan.shuffle,
            scale: self.scale,
        })
    }
}

/// Scale-dependent pixel-shuffle head.
#[derive(Module, Debug)]
pub struct Upsampler<B: Backend> {
    expand: Vec<Conv2d<B>>,
    refine: Conv2d<B>,
    pub(crate) output: Conv2d<B>,
    activation: LeakyRelu,
    shuffle: usize,
    pub(crate) scale: usize,
}

impl<B: Backend> Upsampler<B> {
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// # Shapes
    ///   - Features [batch, nf, height, width]
    ///   - Center frame [batch, 3, height, width]
    ///   - Output [batch, 3, height · scale, width · scale]
    pub fn forward(&self, features: Tensor<B, 4>, center: Tensor<B, 4>) -> error::Result<Tensor<B, 4>> {
        let plan = ExpansionPlan::for_scale(self.scale)?;
        if plan.rounds != self.expand.len() || plan.shuffle != self.shuffle {
            return Err(EdvrError::UnsupportedScale { scale: self.scale });
        }

        let sr = self.expand.iter().fold(features, |x, conv| {
            self.activation
                .forward(pixel_shuffle(conv.forward(x), self.shuffle))
        });
        let sr = self.activation.forward(self.refine.forward(sr));
        let sr = self.output.forward(sr);

        Ok(sr + bilinear_upsample(center, self.scale))
    }
}
