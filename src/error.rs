use thiserror::Error;

/// Errors raised while building or running an EDVR network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EdvrError {
    /// Upsampling factor outside of {2, 3, 4}.
    #[error("scale {scale} is not supported (expected 2, 3 or 4)")]
    UnsupportedScale { scale: usize },
}

pub type Result<T> = std::result::Result<T, EdvrError>;
