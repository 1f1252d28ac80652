//! Error types for finereg.

use thiserror::Error;

/// Result alias for finereg operations.
pub type FineRegResult<T> = std::result::Result<T, FineRegError>;

/// Errors that can occur when configuring or running a registration.
///
/// Out-of-bounds candidates and degenerate patches are not errors; they are
/// reported through invalid output cells instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FineRegError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too small for the requested layout.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region does not fit inside the image.
    #[error(
        "region ({x}, {y}) {width}x{height} out of bounds for image {img_width}x{img_height}"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A configuration field holds an unusable value.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    /// The metric token is not one of the supported kinds.
    #[error("metric `{got}` not recognized; possible choices are: CC, CCSM, MSD, MRSD, MI")]
    UnknownMetric { got: String },
    /// The validity threshold direction token is malformed.
    #[error("validity mask direction `{got}` not recognized; expected lowerThan or greaterThan")]
    InvalidThresholdDirection { got: String },
    /// Image geometry is unusable (zero or non-finite spacing, bad origin).
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: &'static str },
    /// Image decoding or encoding failed.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
}
