//! Planar projective transforms.
//!
//! Points map through `H * (x, y, 1)` followed by division by the third
//! coordinate, which must stay positive.

use crate::geometry::Point;
use nalgebra::{Matrix3, Vector3};

/// Smallest accepted `|det(H)|` once `H` is scaled so that `h[2][2] == 1`.
const MIN_DET: f64 = 1e-10;
/// Smallest accepted projective depth for a mapped point.
const MIN_DEPTH: f64 = 1e-12;

/// Validated 3x3 projective transform, stored with `h[2][2] == 1`.
///
/// In the registration pipeline the transform maps live-frame pixels into
/// the master frame. Construction rejects non-finite and singular matrices,
/// so a `Homography` value is always safe to invert and apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    h: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            h: Matrix3::identity(),
        }
    }

    /// Normalizes and validates `h`; returns `None` for degenerate input.
    pub fn try_from_matrix(h: Matrix3<f64>) -> Option<Self> {
        if !h.iter().all(|v| v.is_finite()) {
            return None;
        }
        let s = h[(2, 2)];
        if s.abs() < 1e-12 {
            return None;
        }
        let h = h / s;
        if !h.iter().all(|v| v.is_finite()) {
            return None;
        }
        let det = h.determinant();
        if !det.is_finite() || det.abs() < MIN_DET {
            return None;
        }
        Some(Self { h })
    }

    /// Builds a homography from row-major coefficients.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Option<Self> {
        Self::try_from_matrix(Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], //
            rows[1][0], rows[1][1], rows[1][2], //
            rows[2][0], rows[2][1], rows[2][2],
        ))
    }

    /// Returns row-major coefficients.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    /// Maps `p` through the transform.
    ///
    /// Returns `None` when `p` lies on or beyond the horizon line (non-positive
    /// projective depth) or the result is not finite.
    #[inline]
    pub fn apply(&self, p: Point) -> Option<Point> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if !(w > MIN_DEPTH) {
            return None;
        }
        let out = Point::new(v[0] / w, v[1] / w);
        out.is_finite().then_some(out)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().and_then(Self::try_from_matrix)
    }

    /// Composes `self` after `other`: `(self ∘ other)(p) = self(other(p))`.
    pub fn compose(&self, other: &Homography) -> Option<Self> {
        Self::try_from_matrix(self.h * other.h)
    }

    /// Checks that every corner of the axis-aligned box maps to a finite
    /// point in front of the camera.
    pub fn is_well_formed_over(&self, min: Point, max: Point) -> bool {
        [
            Point::new(min.x, min.y),
            Point::new(max.x, min.y),
            Point::new(max.x, max.y),
            Point::new(min.x, max.y),
        ]
        .into_iter()
        .all(|corner| self.apply(corner).is_some())
    }

    /// Largest absolute coefficient difference to `other`.
    pub fn max_abs_diff(&self, other: &Homography) -> f64 {
        self.h
            .iter()
            .zip(other.h.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::from_rows([
            [1.2, 0.1, 5.0],
            [-0.05, 0.9, 3.0],
            [0.0004, 0.0002, 1.0],
        ])
        .unwrap();
        let inv = h.inverse().unwrap();
        for p in [
            Point::new(0.0, 0.0),
            Point::new(50.0, -20.0),
            Point::new(320.0, 200.0),
        ] {
            let q = h.apply(p).unwrap();
            assert_close(inv.apply(q).unwrap(), p, 1e-9);
        }
    }

    #[test]
    fn normalizes_scale() {
        let h = Homography::from_rows([[2.0, 0.0, 4.0], [0.0, 2.0, 6.0], [0.0, 0.0, 2.0]]).unwrap();
        assert_eq!(h.to_rows()[2][2], 1.0);
        assert_close(h.apply(Point::new(1.0, 1.0)).unwrap(), Point::new(3.0, 4.0), 1e-12);
    }

    #[test]
    fn rejects_singular_and_non_finite() {
        assert!(
            Homography::from_rows([[1.0, 2.0, 0.0], [2.0, 4.0, 0.0], [0.0, 0.0, 1.0]]).is_none()
        );
        assert!(
            Homography::from_rows([[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
                .is_none()
        );
        assert!(
            Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]).is_none()
        );
    }

    #[test]
    fn points_beyond_horizon_do_not_map() {
        let h = Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.01, 0.0, 1.0]])
            .unwrap();
        assert!(h.apply(Point::new(-100.0, 0.0)).is_none());
        assert!(h.apply(Point::new(-200.0, 5.0)).is_none());
        assert!(!h.is_well_formed_over(Point::new(-150.0, 0.0), Point::new(10.0, 10.0)));
        assert!(h.is_well_formed_over(Point::new(0.0, 0.0), Point::new(640.0, 480.0)));
    }
}
