//! ParkAlign registers aerial parking-lot images to a reference view and
//! decides which parking spots are occupied.
//!
//! The registration chain is [`FeatureExtractor`] → [`CorrespondenceMatcher`]
//! → [`HomographyEstimator`] → [`ImageWarper`]; [`OccupancyEvaluator`] then
//! maps externally supplied vehicle detections onto the lot's spot polygons.
//! [`OccupancyPipeline`] wires the stages together around an injected
//! [`Detector`]. Optional features: `rayon` (parallel inner loops), `simd`
//! (vectorized descriptor distances), `image-io` (file decoding and lot
//! loading) and `tracing` (stage spans and counters).

pub mod detect;
pub mod features;
pub mod geometry;
pub mod homography;
pub mod image;
pub mod lot;
pub mod matching;
pub mod occupancy;
pub mod overlay;
pub mod pipeline;
mod refine;
mod trace;
pub mod util;
pub mod warp;

pub use detect::{CenterBox, Detector, DetectorError, StaticDetector};
pub use features::{Descriptor, FeatureConfig, FeatureExtractor, Keypoint, KeypointSet};
pub use geometry::{Homography, Point};
pub use homography::{Estimate, EstimateError, HomographyEstimator, RansacConfig};
pub use image::pyramid::ImagePyramid;
pub use image::{Image, ImageView};
pub use lot::{parse_spots_json, Lot, LotRegistry};
pub use matching::{Correspondence, CorrespondenceMatcher, MatchConfig};
pub use occupancy::{
    evaluate, Detection, OccupancyEvaluator, OccupancyRecord, OccupancyReport, ParkingSpot,
};
pub use overlay::render_overlay;
pub use pipeline::{
    Aligner, Alignment, AlignmentDiagnostics, AlignmentFailure, AlignmentOutcome, FailureKind,
    FallbackPolicy, OccupancyPipeline, PipelineConfig, PipelineError, PipelineReport,
};
pub use util::{ParkAlignError, ParkAlignResult};
pub use warp::{warp_perspective, ImageWarper};

#[cfg(feature = "image-io")]
pub use lot::load_lot_dir;
