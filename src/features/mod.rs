//! Keypoint extraction: multi-scale Harris corners with rotated
//! gradient-histogram descriptors.
//!
//! Extraction is deterministic for a fixed image and [`FeatureConfig`]:
//! corners are ordered by pyramid level, then by descending response with a
//! `(y, x)` tie-break, and no randomness is involved. Images without texture
//! produce an empty [`KeypointSet`].

mod corners;
mod descriptor;
pub(crate) mod filter;
mod peaks;

pub use descriptor::{Descriptor, DESCRIPTOR_LEN};

use crate::features::corners::{harris_response, select_corners, Corner};
use crate::features::descriptor::{describe, dominant_orientation, PATCH_MARGIN};
use crate::features::filter::{gaussian_blur, sobel, FloatPlane};
use crate::geometry::Point;
use crate::image::pyramid::ImagePyramid;
use crate::image::Image;
use crate::trace::{trace_event, trace_span};
use crate::util::{ParkAlignError, ParkAlignResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Salient image location with its scale and orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Column in base-image pixels.
    pub x: f64,
    /// Row in base-image pixels.
    pub y: f64,
    /// Pyramid level the corner was found on.
    pub level: usize,
    /// Base pixels per level pixel (`2^level`).
    pub scale: f32,
    /// Dominant gradient orientation in radians, in [0, 2π).
    pub angle: f32,
    /// Harris response at the corner.
    pub response: f32,
}

impl Keypoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Keypoints of one image with their descriptors, index-aligned.
#[derive(Clone, Debug, Default)]
pub struct KeypointSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl KeypointSet {
    /// Builds a set from index-aligned keypoints and descriptors.
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> ParkAlignResult<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(ParkAlignError::KeypointCountMismatch {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    fn push(&mut self, keypoint: Keypoint, descriptor: Descriptor) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }
}

/// Parameters of the corner detector and descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureConfig {
    /// Upper bound on keypoints, split evenly across pyramid levels.
    pub max_keypoints: usize,
    /// Maximum number of pyramid levels.
    pub levels: usize,
    /// Pre-smoothing applied to each level before differentiation.
    pub blur_sigma: f32,
    /// Gaussian window of the structure tensor.
    pub window_sigma: f32,
    /// Harris sensitivity `k`.
    pub harris_k: f32,
    /// Minimum response relative to the level's strongest response.
    pub quality_level: f32,
    /// Chebyshev suppression radius in level pixels.
    pub nms_radius: usize,
    /// Corners closer than this to a level border are ignored.
    pub border: usize,
    /// Compute descriptors in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_keypoints: 2000,
            levels: 4,
            blur_sigma: 1.2,
            window_sigma: 1.5,
            harris_k: 0.04,
            quality_level: 0.01,
            nms_radius: 4,
            border: PATCH_MARGIN,
            parallel: false,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> ParkAlignResult<()> {
        if self.max_keypoints == 0 {
            return Err(ParkAlignError::InvalidConfig {
                reason: "max_keypoints must be > 0",
            });
        }
        if self.levels == 0 {
            return Err(ParkAlignError::InvalidConfig {
                reason: "levels must be >= 1",
            });
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(ParkAlignError::InvalidConfig {
                reason: "blur_sigma must be finite and >= 0",
            });
        }
        if !(self.window_sigma.is_finite() && self.window_sigma > 0.0) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "window_sigma must be finite and > 0",
            });
        }
        if !(self.harris_k > 0.0 && self.harris_k < 0.25) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "harris_k must be in (0, 0.25)",
            });
        }
        if !(self.quality_level > 0.0 && self.quality_level < 1.0) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "quality_level must be in (0, 1)",
            });
        }
        if self.border < PATCH_MARGIN {
            return Err(ParkAlignError::InvalidConfig {
                reason: "border must cover the descriptor patch (>= 12)",
            });
        }
        Ok(())
    }
}

/// Converts images into keypoints with descriptors.
#[derive(Clone, Debug)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Creates an extractor after validating `config`.
    pub fn new(config: FeatureConfig) -> ParkAlignResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extracts keypoints from `image`; color images are converted to luma.
    pub fn extract(&self, image: &Image) -> KeypointSet {
        let cfg = &self.config;
        let _span = trace_span!(
            "extract_features",
            width = image.width(),
            height = image.height()
        )
        .entered();

        let pyramid = ImagePyramid::build(image, cfg.levels, 2 * cfg.border + 1);
        let per_level = (cfg.max_keypoints / pyramid.len()).max(1);

        let mut out = KeypointSet::default();
        for level in 0..pyramid.len() {
            let Some(view) = pyramid.level(level) else {
                continue;
            };
            let smooth = gaussian_blur(&FloatPlane::from_u8(view), cfg.blur_sigma);
            let (gx, gy) = sobel(&smooth);
            let response = harris_response(&gx, &gy, cfg.harris_k, cfg.window_sigma);
            let corners = select_corners(&response, cfg, per_level);

            let scale = (1u32 << level) as f32;
            for (keypoint, descriptor) in self.describe_level(&gx, &gy, &corners, level, scale) {
                out.push(keypoint, descriptor);
            }
            trace_event!("level_keypoints", level = level, count = corners.len());
        }

        trace_event!("keypoints", count = out.len());
        out
    }

    fn describe_level(
        &self,
        gx: &FloatPlane,
        gy: &FloatPlane,
        corners: &[Corner],
        level: usize,
        scale: f32,
    ) -> Vec<(Keypoint, Descriptor)> {
        let describe_one = |corner: &Corner| {
            let angle = dominant_orientation(gx, gy, corner.x, corner.y);
            let descriptor = describe(gx, gy, corner.x, corner.y, angle);
            let keypoint = Keypoint {
                x: f64::from((corner.x + 0.5) * scale - 0.5),
                y: f64::from((corner.y + 0.5) * scale - 0.5),
                level,
                scale,
                angle,
                response: corner.response,
            };
            (keypoint, descriptor)
        };

        #[cfg(feature = "rayon")]
        if self.config.parallel {
            return corners.par_iter().map(describe_one).collect();
        }

        corners.iter().map(describe_one).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            config: FeatureConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypoint(x: f64, y: f64) -> Keypoint {
        Keypoint {
            x,
            y,
            level: 0,
            scale: 1.0,
            angle: 0.0,
            response: 1.0,
        }
    }

    #[test]
    fn keypoint_set_requires_paired_descriptors() {
        let err = KeypointSet::new(
            vec![keypoint(1.0, 2.0), keypoint(3.0, 4.0)],
            vec![[0.0; DESCRIPTOR_LEN]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParkAlignError::KeypointCountMismatch {
                keypoints: 2,
                descriptors: 1
            }
        );

        let set = KeypointSet::new(vec![keypoint(1.0, 2.0)], vec![[0.0; DESCRIPTOR_LEN]]).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.keypoints()[0].point(), Point::new(1.0, 2.0));
    }

    #[test]
    fn flat_image_yields_no_keypoints() {
        let image = Image::filled(96, 96, 1, 128).unwrap();
        assert!(FeatureExtractor::default().extract(&image).is_empty());
    }
}
