//! Error types for parkalign.

use thiserror::Error;

/// Result alias for parkalign operations.
pub type ParkAlignResult<T> = std::result::Result<T, ParkAlignError>;

/// Structural errors raised while building inputs or loading lot data.
///
/// Registration outcomes (too few features, matches, or a degenerate
/// transform) are not errors of this kind; they are reported through
/// [`crate::AlignmentFailure`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParkAlignError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row length.
    #[error("invalid stride {stride} for row length {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer does not hold the advertised pixels.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not fit inside the view.
    #[error("roi out of bounds: x={x}, y={y}, width={width}, height={height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    /// Keypoints and descriptors are paired by index, so their counts must match.
    #[error("{keypoints} keypoints but {descriptors} descriptors")]
    KeypointCountMismatch { keypoints: usize, descriptors: usize },
    /// Only single-channel and three-channel images are supported.
    #[error("unsupported channel count {channels}, expected 1 or 3")]
    InvalidChannels { channels: usize },
    /// A transform could not be inverted for resampling.
    #[error("transform is not invertible")]
    NonInvertibleTransform,
    /// A parking spot polygon has fewer than three vertices.
    #[error("spot {id:?} has {points} polygon points, at least 3 are required")]
    InvalidPolygon { id: String, points: usize },
    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate in {context}")]
    NonFiniteCoordinate { context: &'static str },
    /// Spot identifiers must be non-empty.
    #[error("spot id must not be empty")]
    EmptySpotId,
    /// Two spots of the same lot share an identifier.
    #[error("duplicate spot id {id:?}")]
    DuplicateSpotId { id: String },
    /// A detection box is malformed.
    #[error("invalid detection box: {reason}")]
    InvalidDetection { reason: &'static str },
    /// A confidence value lies outside its accepted range.
    #[error("confidence {value} outside [0, {max}]")]
    InvalidConfidence { value: f64, max: f64 },
    /// A configuration parameter is out of range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Spot definitions are not valid JSON of the expected shape.
    #[error("invalid spot definitions: {reason}")]
    InvalidSpotJson { reason: String },
    /// Image decoding or encoding failed.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
    /// Lot reference data could not be read or parsed.
    #[error("lot {lot_id:?}: {reason}")]
    LotIo { lot_id: String, reason: String },
}
