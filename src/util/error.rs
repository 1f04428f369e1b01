//! Error types for boardsight.

use thiserror::Error;

/// Result alias for boardsight operations.
pub type BoardSightResult<T> = std::result::Result<T, BoardSightError>;

/// Errors that can occur while building caches, geometry or running a cycle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardSightError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride shorter than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the declared image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested ROI does not fit inside the image.
    #[error(
        "roi out of bounds: ({x}, {y}) {width}x{height} in {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Unsupported number of interleaved channels in a frame.
    #[error("unsupported channel count: {channels}")]
    UnsupportedChannels { channels: usize },
    /// Template statistics make correlation undefined.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Scale list or adaptive range parameters are unusable.
    #[error("invalid scale set: {reason}")]
    InvalidScaleSet { reason: &'static str },
    /// Search region fractions are out of range or empty.
    #[error("invalid search region: {reason}")]
    InvalidRegion { reason: &'static str },
    /// Hex board calibration table is inconsistent.
    #[error("invalid calibration: {reason}")]
    InvalidCalibration { reason: &'static str },
    /// A configuration value is out of its valid range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Image decoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
    /// Filesystem access failed.
    #[error("io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for BoardSightError {
    fn from(err: std::io::Error) -> Self {
        BoardSightError::Io {
            reason: err.to_string(),
        }
    }
}
