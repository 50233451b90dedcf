//! Robust live-to-master homography estimation.
//!
//! [`HomographyEstimator`] runs a seeded RANSAC over correspondences:
//! minimal four-point samples are solved exactly, every candidate is scored
//! against all correspondences by live-to-master reprojection error, and the
//! best candidate (most inliers, then lowest summed inlier error) is
//! optionally re-fit on its inliers by least squares. A fixed seed makes the
//! result reproducible for identical inputs.

mod dlt;

use crate::geometry::{Homography, Point};
use crate::matching::Correspondence;
use crate::trace::{trace_event, trace_span};
use crate::util::{ParkAlignError, ParkAlignResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use dlt::{homography_from_4pt, homography_least_squares};

const SAMPLE_SIZE: usize = 4;

/// RANSAC parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacConfig {
    /// Quality gate: fewer correspondences are rejected outright.
    pub min_matches: usize,
    /// Inlier tolerance in master-frame pixels.
    pub reproj_threshold: f64,
    /// Upper bound on sampling iterations.
    pub max_iters: usize,
    /// Desired probability of drawing at least one all-inlier sample; lowers
    /// the iteration bound as the inlier ratio improves.
    pub confidence: f64,
    pub seed: u64,
    /// Re-fit the winning model on all of its inliers.
    pub refine: bool,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            min_matches: 10,
            reproj_threshold: 5.0,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0x5eed,
            refine: true,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> ParkAlignResult<()> {
        if self.min_matches < SAMPLE_SIZE {
            return Err(ParkAlignError::InvalidConfig {
                reason: "min_matches must be >= 4",
            });
        }
        if !(self.reproj_threshold.is_finite() && self.reproj_threshold > 0.0) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "reproj_threshold must be finite and > 0",
            });
        }
        if self.max_iters == 0 {
            return Err(ParkAlignError::InvalidConfig {
                reason: "max_iters must be > 0",
            });
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "confidence must be in (0, 1)",
            });
        }
        Ok(())
    }
}

/// Successful estimation result.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    /// Live-to-master transform.
    pub homography: Homography,
    /// Number of correspondences within the reprojection tolerance.
    pub inliers: usize,
    /// Per-correspondence inlier flags, index-aligned with the input.
    pub inlier_mask: Vec<bool>,
    /// Sampling iterations actually run.
    pub iterations: usize,
    /// Mean reprojection error over inliers, in pixels.
    pub mean_error: f64,
}

impl Estimate {
    /// Fraction of correspondences that are inliers.
    pub fn inlier_ratio(&self) -> f64 {
        if self.inlier_mask.is_empty() {
            0.0
        } else {
            self.inliers as f64 / self.inlier_mask.len() as f64
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("insufficient matches: {matches} (need at least {required})")]
    InsufficientMatches { matches: usize, required: usize },
    #[error("no well-formed homography from {matches} matches")]
    DegenerateHomography { matches: usize },
}

/// Candidate score: more inliers win, then lower summed inlier error.
#[derive(Clone, Debug)]
struct Scored {
    homography: Homography,
    inliers: usize,
    error_sum: f64,
    mask: Vec<bool>,
}

impl Scored {
    fn beats(&self, other: &Scored) -> bool {
        self.inliers > other.inliers
            || (self.inliers == other.inliers && self.error_sum < other.error_sum)
    }
}

/// Live-to-master reprojection error; points that do not map are infinitely
/// far away.
#[inline]
fn reprojection_error(h: &Homography, c: &Correspondence) -> f64 {
    h.apply(c.live)
        .map(|p| p.distance(c.master))
        .unwrap_or(f64::INFINITY)
}

fn score(h: Homography, matches: &[Correspondence], threshold: f64) -> Scored {
    let mut mask = vec![false; matches.len()];
    let mut inliers = 0usize;
    let mut error_sum = 0.0;
    for (flag, c) in mask.iter_mut().zip(matches) {
        let err = reprojection_error(&h, c);
        if err < threshold {
            *flag = true;
            inliers += 1;
            error_sum += err;
        }
    }
    Scored {
        homography: h,
        inliers,
        error_sum,
        mask,
    }
}

/// Iterations needed to draw an all-inlier sample with probability
/// `confidence` at the given inlier ratio, capped at `max_iters`.
fn adaptive_bound(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
    let p_good = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if p_good >= 1.0 {
        return 1;
    }
    let denom = (1.0 - p_good).ln();
    if !(denom < 0.0) {
        return max_iters;
    }
    let needed = ((1.0 - confidence).ln() / denom).ceil();
    if needed.is_finite() && needed >= 1.0 && needed < max_iters as f64 {
        needed as usize
    } else if needed.is_finite() && needed < 1.0 {
        1
    } else {
        max_iters
    }
}

/// Estimates a live-to-master homography from correspondences.
#[derive(Clone, Debug, Default)]
pub struct HomographyEstimator {
    config: RansacConfig,
}

impl HomographyEstimator {
    pub fn new(config: RansacConfig) -> ParkAlignResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.config
    }

    /// Runs RANSAC over `matches`.
    ///
    /// Candidates must stay well formed over the bounding box of the live
    /// points. Fails with [`EstimateError::InsufficientMatches`] below the
    /// quality gate and with [`EstimateError::DegenerateHomography`] when no
    /// sample yields a well-formed transform. No minimum inlier count is
    /// imposed.
    pub fn estimate(&self, matches: &[Correspondence]) -> Result<Estimate, EstimateError> {
        self.run(matches, None)
    }

    /// Like [`estimate`](Self::estimate), but every candidate must map the
    /// whole live-frame box `[min, max]` to finite points in front of the
    /// camera, typically the live image rectangle.
    pub fn estimate_over(
        &self,
        matches: &[Correspondence],
        min: Point,
        max: Point,
    ) -> Result<Estimate, EstimateError> {
        self.run(matches, Some((min, max)))
    }

    fn run(
        &self,
        matches: &[Correspondence],
        region: Option<(Point, Point)>,
    ) -> Result<Estimate, EstimateError> {
        let cfg = &self.config;
        let n = matches.len();
        let _span = trace_span!("estimate_homography", matches = n).entered();

        let required = cfg.min_matches.max(SAMPLE_SIZE);
        if n < required {
            trace_event!("rejected", reason = "insufficient_matches", matches = n);
            return Err(EstimateError::InsufficientMatches {
                matches: n,
                required,
            });
        }

        let (min, max) = region.unwrap_or_else(|| live_bounds(matches));
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut best: Option<Scored> = None;
        let mut bound = cfg.max_iters;
        let mut iterations = 0usize;

        while iterations < bound {
            iterations += 1;
            let sample = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
            let live: [Point; SAMPLE_SIZE] = std::array::from_fn(|i| matches[sample.index(i)].live);
            let master: [Point; SAMPLE_SIZE] =
                std::array::from_fn(|i| matches[sample.index(i)].master);

            let Some(h) = homography_from_4pt(&live, &master) else {
                continue;
            };
            if !maps_sample(&h, &live) || !h.is_well_formed_over(min, max) {
                continue;
            }

            let candidate = score(h, matches, cfg.reproj_threshold);
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                bound = bound.min(adaptive_bound(
                    cfg.confidence,
                    candidate.inliers as f64 / n as f64,
                    cfg.max_iters,
                ));
                best = Some(candidate);
            }
        }

        let Some(mut best) = best else {
            trace_event!("rejected", reason = "degenerate", iterations = iterations);
            return Err(EstimateError::DegenerateHomography { matches: n });
        };

        if cfg.refine && best.inliers > SAMPLE_SIZE {
            let pairs: Vec<(Point, Point)> = matches
                .iter()
                .zip(&best.mask)
                .filter(|&(_, &inlier)| inlier)
                .map(|(c, _)| (c.live, c.master))
                .collect();
            let fitted =
                homography_least_squares(&pairs).filter(|h| h.is_well_formed_over(min, max));
            if let Some(h) = fitted {
                let refit = score(h, matches, cfg.reproj_threshold);
                if !best.beats(&refit) {
                    best = refit;
                }
            }
        }

        let mean_error = if best.inliers > 0 {
            best.error_sum / best.inliers as f64
        } else {
            0.0
        };
        trace_event!(
            "estimate",
            inliers = best.inliers,
            iterations = iterations,
            mean_error = mean_error
        );

        Ok(Estimate {
            homography: best.homography,
            inliers: best.inliers,
            inlier_mask: best.mask,
            iterations,
            mean_error,
        })
    }
}

/// Axis-aligned box around the live points of `matches`.
fn live_bounds(matches: &[Correspondence]) -> (Point, Point) {
    matches.iter().fold(
        (
            Point::new(f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(min, max), c| {
            (
                Point::new(min.x.min(c.live.x), min.y.min(c.live.y)),
                Point::new(max.x.max(c.live.x), max.y.max(c.live.y)),
            )
        },
    )
}

/// A candidate must map its own sample to finite points in front of the
/// camera.
fn maps_sample(h: &Homography, live: &[Point; SAMPLE_SIZE]) -> bool {
    live.iter().all(|&p| h.apply(p).is_some())
}
