//! Descriptor correspondence search with Lowe's ratio test.
//!
//! Every live descriptor is compared against all master descriptors (exact
//! two-nearest-neighbor search), so the result depends only on the inputs.
//! Output is ordered by live keypoint index.

pub mod distance;

use crate::features::{Descriptor, KeypointSet};
use crate::geometry::Point;
use crate::matching::distance::l2_squared;
use crate::trace::{trace_event, trace_span};
use crate::util::{ParkAlignError, ParkAlignResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Ratio used by the reference pipeline to reject ambiguous matches.
pub const DEFAULT_RATIO: f32 = 0.7;

/// A master/live keypoint pair accepted by the matcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Index into the master keypoint set.
    pub master_index: usize,
    /// Index into the live keypoint set.
    pub live_index: usize,
    /// Keypoint location in the master frame.
    pub master: Point,
    /// Keypoint location in the live frame.
    pub live: Point,
    /// Euclidean descriptor distance of the pair.
    pub distance: f32,
}

/// Matcher configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    /// Keep a match only if `nearest < ratio * second_nearest`.
    pub ratio: f32,
    /// Also require the live keypoint to be the master keypoint's nearest
    /// neighbor.
    pub cross_check: bool,
    /// Search in parallel over live descriptors (requires `rayon`).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            cross_check: false,
            parallel: false,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> ParkAlignResult<()> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(ParkAlignError::InvalidConfig {
                reason: "ratio must be in (0, 1]",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Neighbors {
    best_index: usize,
    best: f32,
    second: f32,
}

/// Two nearest rows of `train` by squared distance; equal distances keep
/// the lower index as nearest.
fn two_nearest(query: &Descriptor, train: &[Descriptor]) -> Option<Neighbors> {
    let mut out: Option<Neighbors> = None;
    for (idx, candidate) in train.iter().enumerate() {
        let dist = l2_squared(query, candidate);
        match out.as_mut() {
            None => {
                out = Some(Neighbors {
                    best_index: idx,
                    best: dist,
                    second: f32::INFINITY,
                })
            }
            Some(n) if dist < n.best => {
                n.second = n.best;
                n.best = dist;
                n.best_index = idx;
            }
            Some(n) if dist < n.second => n.second = dist,
            Some(_) => {}
        }
    }
    out
}

/// Finds ratio-test-filtered correspondences between two keypoint sets.
#[derive(Clone, Debug, Default)]
pub struct CorrespondenceMatcher {
    config: MatchConfig,
}

impl CorrespondenceMatcher {
    pub fn new(config: MatchConfig) -> ParkAlignResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Matches every live keypoint against the master set.
    ///
    /// Returns an empty list when either set is empty, or when the master set
    /// has a single descriptor (no second neighbor to test ambiguity).
    pub fn match_keypoints(&self, master: &KeypointSet, live: &KeypointSet) -> Vec<Correspondence> {
        let _span = trace_span!(
            "match_correspondences",
            master = master.len(),
            live = live.len()
        )
        .entered();

        if master.len() < 2 || live.is_empty() {
            trace_event!("correspondences", count = 0usize);
            return Vec::new();
        }

        let out: Vec<Correspondence> = {
            #[cfg(feature = "rayon")]
            {
                if self.config.parallel {
                    (0..live.len())
                        .into_par_iter()
                        .filter_map(|idx| self.match_one(master, live, idx))
                        .collect()
                } else {
                    (0..live.len())
                        .filter_map(|idx| self.match_one(master, live, idx))
                        .collect()
                }
            }
            #[cfg(not(feature = "rayon"))]
            {
                (0..live.len())
                    .filter_map(|idx| self.match_one(master, live, idx))
                    .collect()
            }
        };

        trace_event!("correspondences", count = out.len());
        out
    }

    fn match_one(
        &self,
        master: &KeypointSet,
        live: &KeypointSet,
        live_index: usize,
    ) -> Option<Correspondence> {
        let query = &live.descriptors()[live_index];
        let n = two_nearest(query, master.descriptors())?;

        let ratio = self.config.ratio;
        // Squared distances: d1 < r * d2  <=>  d1^2 < r^2 * d2^2.
        if !(n.best < ratio * ratio * n.second) {
            return None;
        }

        if self.config.cross_check {
            let back = two_nearest(&master.descriptors()[n.best_index], live.descriptors())?;
            if back.best_index != live_index {
                return None;
            }
        }

        Some(Correspondence {
            master_index: n.best_index,
            live_index,
            master: master.keypoints()[n.best_index].point(),
            live: live.keypoints()[live_index].point(),
            distance: n.best.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Keypoint, DESCRIPTOR_LEN};

    fn unit(axis: usize, scale: f32) -> Descriptor {
        let mut d = [0.0f32; DESCRIPTOR_LEN];
        d[axis] = scale;
        d
    }

    fn set(descriptors: Vec<Descriptor>) -> KeypointSet {
        let keypoints = (0..descriptors.len())
            .map(|i| Keypoint {
                x: i as f64 * 10.0,
                y: i as f64,
                level: 0,
                scale: 1.0,
                angle: 0.0,
                response: 1.0,
            })
            .collect();
        KeypointSet::new(keypoints, descriptors).unwrap()
    }

    #[test]
    fn distinctive_matches_pass_ratio_test() {
        let master = set(vec![unit(0, 1.0), unit(1, 1.0), unit(2, 1.0)]);
        let live = set(vec![unit(2, 0.9), unit(0, 1.0)]);
        let matcher = CorrespondenceMatcher::default();
        let out = matcher.match_keypoints(&master, &live);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].live_index, out[0].master_index), (0, 2));
        assert_eq!((out[1].live_index, out[1].master_index), (1, 0));
        assert_eq!(out[1].distance, 0.0);
        assert_eq!(out[0].master, Point::new(20.0, 2.0));
    }

    #[test]
    fn ambiguous_matches_are_rejected() {
        // Live descriptor is equidistant from two master descriptors.
        let mut halfway = [0.0f32; DESCRIPTOR_LEN];
        halfway[0] = 0.5;
        halfway[1] = 0.5;
        let master = set(vec![unit(0, 1.0), unit(1, 1.0)]);
        let live = set(vec![halfway]);
        assert!(CorrespondenceMatcher::default()
            .match_keypoints(&master, &live)
            .is_empty());
    }

    #[test]
    fn empty_or_single_master_yields_nothing() {
        let matcher = CorrespondenceMatcher::default();
        let live = set(vec![unit(0, 1.0)]);
        assert!(matcher
            .match_keypoints(&KeypointSet::default(), &live)
            .is_empty());
        assert!(matcher
            .match_keypoints(&set(vec![unit(0, 1.0)]), &live)
            .is_empty());
        assert!(matcher
            .match_keypoints(&live, &KeypointSet::default())
            .is_empty());
    }

    #[test]
    fn cross_check_drops_many_to_one() {
        let master = set(vec![unit(0, 1.0), unit(5, 1.0)]);
        let live = set(vec![unit(0, 1.0), unit(0, 0.8)]);
        let plain = CorrespondenceMatcher::default().match_keypoints(&master, &live);
        assert_eq!(plain.len(), 2);

        let checked = CorrespondenceMatcher::new(MatchConfig {
            cross_check: true,
            ..MatchConfig::default()
        })
        .unwrap()
        .match_keypoints(&master, &live);
        assert_eq!(checked.len(), 1);
        assert_eq!(checked[0].live_index, 0);
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        let err = CorrespondenceMatcher::new(MatchConfig {
            ratio: 1.5,
            ..MatchConfig::default()
        })
        .err();
        assert!(matches!(err, Some(ParkAlignError::InvalidConfig { .. })));
    }
}
