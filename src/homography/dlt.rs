//! Direct linear transform solvers with Hartley normalization.
//!
//! Both solvers return `dst ~ H * src` as a validated [`Homography`]; a
//! singular system or a degenerate result yields `None`.

use crate::geometry::{Homography, Point};
use nalgebra::{DMatrix, Matrix3, SMatrix, SVector, Vector3};

fn hartley(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Translates points to their centroid and scales the mean distance to √2.
fn normalize<I>(pts: I, n: usize) -> (Vec<Point>, Matrix3<f64>)
where
    I: Iterator<Item = Point> + Clone,
{
    let nf = n as f64;
    let (sx, sy) = pts.clone().fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
    let (cx, cy) = (sx / nf, sy / nf);
    let mean_dist = pts
        .clone()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / nf;

    let t = hartley(cx, cy, mean_dist);
    let out = pts
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn denormalize(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Homography> {
    let t_dst_inv = t_dst.try_inverse()?;
    Homography::try_from_matrix(t_dst_inv * hn * t_src)
}

/// Sine of the smallest angle at which three points still count as a triangle.
const COLLINEAR_SIN: f64 = 1e-3;

/// True when any three of the four points are (nearly) collinear or coincide.
pub(crate) fn has_collinear_triple(pts: &[Point; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (ax, ay) = (pts[j].x - pts[i].x, pts[j].y - pts[i].y);
        let (bx, by) = (pts[k].x - pts[i].x, pts[k].y - pts[i].y);
        let cross = (ax * by - ay * bx).abs();
        cross <= COLLINEAR_SIN * ax.hypot(ay) * bx.hypot(by)
    })
}

/// Exact solution from four correspondences, with `h[2][2]` fixed to 1.
pub(crate) fn homography_from_4pt(src: &[Point; 4], dst: &[Point; 4]) -> Option<Homography> {
    if has_collinear_triple(src) || has_collinear_triple(dst) {
        return None;
    }
    let (src_n, t_src) = normalize(src.iter().copied(), 4);
    let (dst_n, t_dst) = normalize(dst.iter().copied(), 4);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    denormalize(hn, t_src, t_dst)
}

/// Least-squares fit over `pairs` (`(src, dst)`), via the right singular
/// vector of the smallest singular value. Four pairs use the exact solver.
pub(crate) fn homography_least_squares(pairs: &[(Point, Point)]) -> Option<Homography> {
    let n = pairs.len();
    if n < 4 {
        return None;
    }
    if n == 4 {
        let src = [pairs[0].0, pairs[1].0, pairs[2].0, pairs[3].0];
        let dst = [pairs[0].1, pairs[1].1, pairs[2].1, pairs[3].1];
        return homography_from_4pt(&src, &dst);
    }

    let (src_n, t_src) = normalize(pairs.iter().map(|p| p.0), n);
    let (dst_n, t_dst) = normalize(pairs.iter().map(|p| p.1), n);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    // Singular values are not guaranteed sorted; pick the smallest explicitly.
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(min_idx);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    denormalize(hn, t_src, t_dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_truth() -> Homography {
        Homography::from_rows([
            [0.8, 0.05, 120.0],
            [-0.02, 1.1, 80.0],
            [0.0009, -0.0004, 1.0],
        ])
        .unwrap()
    }

    fn assert_close(a: Point, b: Point, tol: f64) {
        assert!(
            a.distance(b) < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    #[test]
    fn four_point_recovers_ground_truth() {
        let gt = ground_truth();
        let src = [
            Point::new(0.0, 0.0),
            Point::new(180.0, 0.0),
            Point::new(180.0, 130.0),
            Point::new(0.0, 130.0),
        ];
        let dst = src.map(|p| gt.apply(p).unwrap());
        let h = homography_from_4pt(&src, &dst).unwrap();
        for p in [Point::new(60.0, 40.0), Point::new(150.0, 120.0)] {
            assert_close(h.apply(p).unwrap(), gt.apply(p).unwrap(), 1e-6);
        }
    }

    #[test]
    fn least_squares_handles_overdetermined_case() {
        let gt = ground_truth();
        let pairs: Vec<(Point, Point)> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point::new(x as f64 * 40.0, y as f64 * 50.0)))
            .map(|p| (p, gt.apply(p).unwrap()))
            .collect();
        let h = homography_least_squares(&pairs).unwrap();
        assert!(h.max_abs_diff(&gt) < 1e-6);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        assert!(has_collinear_triple(&src));
        assert!(homography_from_4pt(&src, &src).is_none());

        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(!has_collinear_triple(&square));
        let repeated = [square[0], square[1], square[2], square[0]];
        assert!(has_collinear_triple(&repeated));
        assert!(homography_least_squares(&[(src[0], src[0])]).is_none());
    }
}
