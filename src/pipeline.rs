//! End-to-end registration and occupancy pipeline.
//!
//! [`Aligner`] chains feature extraction, matching, homography estimation and
//! warping, and reports failures with diagnostic counts instead of a bare
//! "no result". [`OccupancyPipeline`] adds an injected [`Detector`] and the
//! occupancy evaluation, with an explicit [`FallbackPolicy`] for failed
//! alignments.

use crate::detect::{Detector, DetectorError};
use crate::features::{FeatureConfig, FeatureExtractor};
use crate::geometry::{Homography, Point};
use crate::homography::{Estimate, EstimateError, HomographyEstimator, RansacConfig};
use crate::image::Image;
use crate::lot::Lot;
use crate::matching::{CorrespondenceMatcher, MatchConfig};
use crate::occupancy::{Detection, OccupancyEvaluator, OccupancyReport};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ParkAlignError, ParkAlignResult};
use crate::warp::ImageWarper;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Counts gathered while aligning, available on success and failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentDiagnostics {
    pub keypoints_master: usize,
    pub keypoints_live: usize,
    /// Correspondences that passed the ratio test.
    pub good_matches: usize,
    pub inliers: usize,
}

/// Why registration failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One of the images produced no keypoints.
    InsufficientFeatures,
    /// Too few correspondences passed the ratio test.
    InsufficientMatches,
    /// No well-formed transform could be estimated.
    DegenerateHomography,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientFeatures => "insufficient_features",
            Self::InsufficientMatches => "insufficient_matches",
            Self::DegenerateHomography => "degenerate_homography",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
#[error(
    "alignment failed: {kind} (keypoints {}/{}, matches {}, inliers {})",
    .diagnostics.keypoints_master,
    .diagnostics.keypoints_live,
    .diagnostics.good_matches,
    .diagnostics.inliers
)]
pub struct AlignmentFailure {
    pub kind: FailureKind,
    pub diagnostics: AlignmentDiagnostics,
}

/// Successful registration of a live image onto the master frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Live image resampled to the master image's size.
    pub aligned: Image,
    pub estimate: Estimate,
    pub diagnostics: AlignmentDiagnostics,
}

impl Alignment {
    /// Live-to-master transform.
    pub fn homography(&self) -> &Homography {
        &self.estimate.homography
    }
}

/// What to do when registration fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Return the failure to the caller.
    #[default]
    Reject,
    /// Detect on the unaligned live image and record the failure.
    UseUnaligned,
}

/// Parameters of every stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub matching: MatchConfig,
    pub ransac: RansacConfig,
    /// Fill value for aligned pixels outside the live image.
    pub background: u8,
    /// Reject alignments with fewer inliers than this.
    pub min_inliers: Option<usize>,
    /// Ignore detections below this confidence, in `[0, 1]`.
    pub min_confidence: f64,
    pub fallback: FallbackPolicy,
}

impl PipelineConfig {
    pub fn validate(&self) -> ParkAlignResult<()> {
        self.features.validate()?;
        self.matching.validate()?;
        self.ransac.validate()?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ParkAlignError::InvalidConfidence {
                value: self.min_confidence,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Registers live images onto a master image.
#[derive(Clone, Debug, Default)]
pub struct Aligner {
    extractor: FeatureExtractor,
    matcher: CorrespondenceMatcher,
    estimator: HomographyEstimator,
    warper: ImageWarper,
}

impl Aligner {
    pub fn new(config: &PipelineConfig) -> ParkAlignResult<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.features)?,
            matcher: CorrespondenceMatcher::new(config.matching)?,
            estimator: HomographyEstimator::new(config.ransac)?,
            warper: ImageWarper::new(config.background)
                .with_parallel(config.features.parallel || config.matching.parallel),
        })
    }

    /// Aligns `live` to `master`; the result has the master's dimensions.
    pub fn align(&self, master: &Image, live: &Image) -> Result<Alignment, AlignmentFailure> {
        let _span = trace_span!(
            "align",
            master_width = master.width(),
            master_height = master.height(),
            live_width = live.width(),
            live_height = live.height()
        )
        .entered();

        let master_features = self.extractor.extract(master);
        let live_features = self.extractor.extract(live);
        let mut diagnostics = AlignmentDiagnostics {
            keypoints_master: master_features.len(),
            keypoints_live: live_features.len(),
            ..AlignmentDiagnostics::default()
        };
        let fail = |kind: FailureKind, diagnostics: AlignmentDiagnostics| {
            trace_warn!(
                "alignment_failed",
                kind = kind.as_str(),
                good_matches = diagnostics.good_matches
            );
            AlignmentFailure { kind, diagnostics }
        };

        if master_features.is_empty() || live_features.is_empty() {
            return Err(fail(FailureKind::InsufficientFeatures, diagnostics));
        }

        let matches = self.matcher.match_keypoints(&master_features, &live_features);
        diagnostics.good_matches = matches.len();

        // Candidates must stay valid over the whole live image.
        let live_max = Point::new((live.width() - 1) as f64, (live.height() - 1) as f64);
        let estimate = match self
            .estimator
            .estimate_over(&matches, Point::new(0.0, 0.0), live_max)
        {
            Ok(estimate) => estimate,
            Err(EstimateError::InsufficientMatches { .. }) => {
                return Err(fail(FailureKind::InsufficientMatches, diagnostics));
            }
            Err(EstimateError::DegenerateHomography { .. }) => {
                return Err(fail(FailureKind::DegenerateHomography, diagnostics));
            }
        };
        diagnostics.inliers = estimate.inliers;

        // Master dimensions are non-zero by construction, so the warp cannot fail
        // on size; any other error means the transform is unusable.
        let aligned = self
            .warper
            .warp(live, &estimate.homography, master.width(), master.height())
            .map_err(|_| fail(FailureKind::DegenerateHomography, diagnostics))?;

        trace_event!(
            "aligned",
            keypoints_master = diagnostics.keypoints_master,
            keypoints_live = diagnostics.keypoints_live,
            good_matches = diagnostics.good_matches,
            inliers = diagnostics.inliers
        );
        Ok(Alignment {
            aligned,
            estimate,
            diagnostics,
        })
    }
}

/// How the detector input was obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum AlignmentOutcome {
    Aligned {
        homography: Homography,
        diagnostics: AlignmentDiagnostics,
        mean_error: f64,
    },
    /// Registration failed and [`FallbackPolicy::UseUnaligned`] was in effect.
    Unaligned(AlignmentFailure),
}

impl AlignmentOutcome {
    pub fn is_aligned(&self) -> bool {
        matches!(self, Self::Aligned { .. })
    }

    pub fn diagnostics(&self) -> &AlignmentDiagnostics {
        match self {
            Self::Aligned { diagnostics, .. } => diagnostics,
            Self::Unaligned(failure) => &failure.diagnostics,
        }
    }
}

/// Result of one pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineReport {
    pub occupancy: OccupancyReport,
    pub alignment: AlignmentOutcome,
    /// Image the detector ran on: the aligned image, or the live image when
    /// the fallback was used.
    pub image: Image,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Alignment(#[from] AlignmentFailure),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error("alignment has {inliers} inliers, at least {required} required")]
    LowInlierCount {
        inliers: usize,
        required: usize,
        diagnostics: AlignmentDiagnostics,
    },
}

/// Aligns a live image to a lot, runs the detector on the result and
/// evaluates occupancy.
#[derive(Debug)]
pub struct OccupancyPipeline<D> {
    aligner: Aligner,
    evaluator: OccupancyEvaluator,
    detector: D,
    min_inliers: Option<usize>,
    fallback: FallbackPolicy,
}

impl<D: Detector> OccupancyPipeline<D> {
    pub fn new(config: &PipelineConfig, detector: D) -> ParkAlignResult<Self> {
        Ok(Self {
            aligner: Aligner::new(config)?,
            evaluator: OccupancyEvaluator::new().with_min_confidence(config.min_confidence)?,
            detector,
            min_inliers: config.min_inliers,
            fallback: config.fallback,
        })
    }

    pub fn aligner(&self) -> &Aligner {
        &self.aligner
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn run(&self, lot: &Lot, live: &Image) -> Result<PipelineReport, PipelineError> {
        let (image, alignment) = match self.aligner.align(lot.master(), live) {
            Ok(a) => {
                if let Some(required) = self.min_inliers {
                    if a.estimate.inliers < required {
                        return Err(PipelineError::LowInlierCount {
                            inliers: a.estimate.inliers,
                            required,
                            diagnostics: a.diagnostics,
                        });
                    }
                }
                let outcome = AlignmentOutcome::Aligned {
                    homography: a.estimate.homography,
                    diagnostics: a.diagnostics,
                    mean_error: a.estimate.mean_error,
                };
                (a.aligned, outcome)
            }
            Err(failure) => match self.fallback {
                FallbackPolicy::Reject => return Err(failure.into()),
                FallbackPolicy::UseUnaligned => {
                    trace_warn!("using_unaligned_image", inliers = failure.diagnostics.inliers);
                    (live.clone(), AlignmentOutcome::Unaligned(failure))
                }
            },
        };

        let detections = self.detector.detect(&image)?;
        let occupancy = self.evaluator.evaluate(&detections, lot.spots());
        Ok(PipelineReport {
            occupancy,
            alignment,
            image,
            detections,
        })
    }
}
