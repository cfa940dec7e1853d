//! EDVR: video super-resolution with pyramid alignment and temporal attention fusion

// Building blocks
pub mod error;
pub mod weight_init;
pub mod residual_block;
pub mod upsample;

// Network stages
pub mod pyramid;
pub mod align;
pub mod fusion;

// Core modules
pub mod device;
pub mod model;
pub mod benchmark;

// Re-exports for convenience
pub use align::{FrameAligner, PyramidAlign, PyramidAlignConfig, align_frames};
pub use error::{EdvrError, Result};
pub use fusion::{FeatureFusion, TemporalAttentionFusion, TemporalAttentionFusionConfig};
pub use model::{Edvr, EdvrConfig};
pub use pyramid::{FeaturePyramid, FramePyramids};
