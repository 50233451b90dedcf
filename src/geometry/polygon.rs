//! Boundary-inclusive point-in-polygon test.

use crate::geometry::Point;

/// Distance below which a point counts as lying on a polygon edge.
const EDGE_EPS: f64 = 1e-9;

/// Returns true when `p` lies on the segment `a`-`b` within `eps`.
pub fn point_on_segment(a: Point, b: Point, p: Point, eps: f64) -> bool {
    let ex = b.x - a.x;
    let ey = b.y - a.y;
    let len2 = ex * ex + ey * ey;
    if len2 <= eps * eps {
        return p.distance(a) <= eps;
    }
    let cross = ex * (p.y - a.y) - ey * (p.x - a.x);
    if cross.abs() > eps * len2.sqrt() {
        return false;
    }
    let dot = ex * (p.x - a.x) + ey * (p.y - a.y);
    dot >= -eps * len2.sqrt() && dot <= len2 + eps * len2.sqrt()
}

/// Tests whether `p` is inside the closed polygon, counting edges as inside.
///
/// The polygon is implicitly closed (last vertex connects to the first) and
/// may be convex or concave; vertex order does not matter. Polygons with
/// fewer than three vertices contain nothing.
pub fn contains_inclusive(polygon: &[Point], p: Point) -> bool {
    let n = polygon.len();
    if n < 3 || !p.is_finite() {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[j];
        let b = polygon[i];
        if point_on_segment(a, b, p, EDGE_EPS) {
            return true;
        }
        // Half-open rule on y so shared vertices are counted once.
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn interior_and_exterior() {
        let poly = square(100.0, 100.0, 200.0, 200.0);
        assert!(contains_inclusive(&poly, Point::new(150.0, 150.0)));
        assert!(!contains_inclusive(&poly, Point::new(250.0, 150.0)));
        assert!(!contains_inclusive(&poly, Point::new(150.0, 99.0)));
    }

    #[test]
    fn edges_and_vertices_count_as_inside() {
        let poly = square(100.0, 100.0, 200.0, 200.0);
        assert!(contains_inclusive(&poly, Point::new(100.0, 150.0)));
        assert!(contains_inclusive(&poly, Point::new(150.0, 200.0)));
        assert!(contains_inclusive(&poly, Point::new(200.0, 200.0)));
        assert!(contains_inclusive(&poly, Point::new(100.0, 100.0)));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U shape opening upwards.
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ];
        assert!(!contains_inclusive(&poly, Point::new(15.0, 20.0)));
        assert!(contains_inclusive(&poly, Point::new(5.0, 20.0)));
        assert!(contains_inclusive(&poly, Point::new(15.0, 10.0)));
    }

    #[test]
    fn slanted_edge_is_inclusive() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(contains_inclusive(&poly, Point::new(5.0, 5.0)));
        assert!(!contains_inclusive(&poly, Point::new(5.1, 5.1)));
    }

    #[test]
    fn degenerate_inputs_contain_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(!contains_inclusive(&line, Point::new(5.0, 0.0)));
        let poly = square(0.0, 0.0, 1.0, 1.0);
        assert!(!contains_inclusive(&poly, Point::new(f64::NAN, 0.5)));
    }
}
