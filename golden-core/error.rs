use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Invalid image {width}x{height} (stride {stride}, {len} bytes): {reason}")]
    InvalidImage {
        width: usize,
        height: usize,
        stride: usize,
        len: usize,
        reason: &'static str,
    },

    #[error("Insufficient descriptors: need at least {required}, got {available}")]
    InsufficientDescriptors { required: usize, available: usize },

    #[error("{keypoints} keypoints paired with {descriptors} descriptors")]
    MismatchedFeatures { keypoints: usize, descriptors: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
