use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Invalid image descriptor: width={width}, height={height}")]
    InvalidImageDescriptor { width: u32, height: u32 },

    #[error("Invalid horizontal field of view: {0} degrees (expected 0 < fov < 180)")]
    InvalidFov(f64),

    #[error("Failed to load image: {0}")]
    ImageLoadFailed(String),

    #[error("Failed to write container: {0}")]
    WriteFailed(String),

    #[error("Invalid depth map: {0}")]
    InvalidDepthMap(String),

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CombineError>;
