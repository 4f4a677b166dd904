use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqueezeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("WebP encoding error: {0}")]
    WebpEncoding(String),

    #[error("pngquant is not installed or could not be found")]
    QuantizerNotFound,

    #[error("pngquant exited with status {status}: {stderr}")]
    QuantizerFailed { status: String, stderr: String },

    #[error("pngquant produced no output file; the result may have been larger than the input and skipped")]
    QuantizerNoOutput,

    #[error("pngquant did not finish within {0:?}")]
    QuantizerTimeout(Duration),

    #[error("Invalid quality value: {0}. Must be between {1} and {2}")]
    InvalidQuality(u8, u8, u8),

    #[error("Invalid quality range: {0}-{1}. Minimum must not exceed maximum")]
    InvalidQualityRange(u8, u8),

    #[error("Invalid quantizer speed: {0}. Must be between 1 and 11")]
    InvalidSpeed(u8),

    #[error("Invalid resize dimensions: {0}x{1}")]
    InvalidResizeDimensions(u32, u32),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Cache manifest error: {0}")]
    CacheManifest(#[from] serde_json::Error),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),
}

pub type Result<T> = std::result::Result<T, SqueezeError>;
