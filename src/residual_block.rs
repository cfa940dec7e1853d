use burn::{
    nn::{
        PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

use crate::weight_init::scaled_kaiming_conv2d;

/// Weight scale applied to the residual convolutions at construction.
const RESIDUAL_INIT_SCALE: f64 = 0.1;

/// Residual block without batch-norm: `x + conv2(relu(conv1(x)))`.
#[derive(Module, Debug)]
pub struct ResidualBlockNoBn<B: Backend> {
    pub(crate) conv1: Conv2d<B>,
    pub(crate) conv2: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ResidualBlockNoBn<B> {
    pub fn new(nf: usize, device: &B::Device) -> Self {
        let conv = || {
            Conv2dConfig::new([nf, nf], [3, 3]).with_padding(PaddingConfig2d::Explicit(1, 1))
        };

        Self {
            conv1: scaled_kaiming_conv2d(conv(), RESIDUAL_INIT_SCALE, device),
            conv2: scaled_kaiming_conv2d(conv(), RESIDUAL_INIT_SCALE, device),
            activation: Relu::new(),
        }
    }

    /// # Shapes
    ///   - Input [batch, nf, height, width]
    ///   - Output [batch, nf, height, width]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.activation.forward(self.conv1.forward(x.clone()));
        x + self.conv2.forward(out)
    }
}

/// A chain of residual blocks applied in order.
#[derive(Module, Debug)]
pub struct ResidualStack<B: Backend> {
    pub blocks: Vec<ResidualBlockNoBn<B>>,
}

impl<B: Backend> ResidualStack<B> {
    pub fn new(nf: usize, num_blocks: usize, device: &B::Device) -> Self {
        let blocks = (0..num_blocks)
            .map(|_| ResidualBlockNoBn::new(nf, device))
            .collect();
        Self { blocks }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
