//! Harris corner response and peak selection on a single pyramid level.

use crate::features::filter::{gaussian_blur, FloatPlane};
use crate::features::peaks::{nms_2d, Peak};
use crate::features::FeatureConfig;
use crate::refine::quad2d::refine_peak_offset_2d;

/// Harris response `det(M) - k * trace(M)^2` of the Gaussian-weighted
/// structure tensor `M`.
pub(crate) fn harris_response(
    gx: &FloatPlane,
    gy: &FloatPlane,
    k: f32,
    window_sigma: f32,
) -> FloatPlane {
    let sxx = gaussian_blur(&gx.zip_map(gx, |a, b| a * b), window_sigma);
    let syy = gaussian_blur(&gy.zip_map(gy, |a, b| a * b), window_sigma);
    let sxy = gaussian_blur(&gx.zip_map(gy, |a, b| a * b), window_sigma);

    let mut out = FloatPlane::zeros(gx.width(), gx.height());
    for y in 0..gx.height() {
        for x in 0..gx.width() {
            let a = sxx.at(x, y);
            let b = syy.at(x, y);
            let c = sxy.at(x, y);
            let trace = a + b;
            out.set(x, y, a * b - c * c - k * trace * trace);
        }
    }
    out
}

/// Corner location on a level, refined to sub-pixel precision.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Corner {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) response: f32,
}

/// Selects at most `limit` well-separated corners away from the border.
///
/// Candidates are local maxima of `response` above `quality_level` times the
/// strongest interior response. Flat images yield no candidates.
pub(crate) fn select_corners(
    response: &FloatPlane,
    cfg: &FeatureConfig,
    limit: usize,
) -> Vec<Corner> {
    let (w, h) = (response.width(), response.height());
    let b = cfg.border;
    if w <= 2 * b || h <= 2 * b || limit == 0 {
        return Vec::new();
    }

    let mut max_response = 0.0f32;
    for y in b..h - b {
        for x in b..w - b {
            max_response = max_response.max(response.at(x, y));
        }
    }
    if !(max_response > 0.0) {
        return Vec::new();
    }
    let threshold = max_response * cfg.quality_level;

    let mut candidates = Vec::new();
    for y in b..h - b {
        for x in b..w - b {
            let v = response.at(x, y);
            if v <= threshold {
                continue;
            }
            let is_max = (-1isize..=1).all(|dy| {
                (-1isize..=1).all(|dx| {
                    (dx == 0 && dy == 0)
                        || response.get_clamped(x as isize + dx, y as isize + dy) <= v
                })
            });
            if is_max {
                candidates.push(Peak { x, y, score: v });
            }
        }
    }

    nms_2d(&mut candidates, cfg.nms_radius, limit, w, h)
        .into_iter()
        .map(|peak| {
            let mut s = [[0.0f32; 3]; 3];
            for (iy, row) in s.iter_mut().enumerate() {
                for (ix, value) in row.iter_mut().enumerate() {
                    *value = response.get_clamped(
                        peak.x as isize + ix as isize - 1,
                        peak.y as isize + iy as isize - 1,
                    );
                }
            }
            let (dx, dy) = refine_peak_offset_2d(s);
            Corner {
                x: peak.x as f32 + dx,
                y: peak.y as f32 + dy,
                response: peak.score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::filter::sobel;
    use crate::image::Image;

    fn plane_with_square(size: usize, x0: usize, y0: usize, side: usize) -> FloatPlane {
        let mut data = vec![20u8; size * size];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                data[y * size + x] = 220;
            }
        }
        let img = Image::gray(data, size, size).unwrap();
        FloatPlane::from_u8(img.plane().unwrap())
    }

    #[test]
    fn square_yields_four_corners() {
        let plane = gaussian_blur(&plane_with_square(96, 30, 30, 36), 1.2);
        let (gx, gy) = sobel(&plane);
        let cfg = FeatureConfig::default();
        let response = harris_response(&gx, &gy, cfg.harris_k, cfg.window_sigma);
        let corners = select_corners(&response, &cfg, 100);
        let expected = [(30.0f32, 30.0f32), (65.0, 30.0), (65.0, 65.0), (30.0, 65.0)];
        let near =
            |c: &Corner, (ex, ey): (f32, f32)| (c.x - ex).abs() < 4.0 && (c.y - ey).abs() < 4.0;
        for c in &corners {
            assert!(
                expected.iter().any(|&e| near(c, e)),
                "unexpected corner {c:?}"
            );
        }
        for e in expected {
            assert!(corners.iter().any(|c| near(c, e)), "missing corner {e:?}");
        }
    }

    #[test]
    fn flat_plane_has_no_corners() {
        let plane = FloatPlane::zeros(64, 64);
        let (gx, gy) = sobel(&plane);
        let response = harris_response(&gx, &gy, 0.04, 1.5);
        assert!(select_corners(&response, &FeatureConfig::default(), 100).is_empty());
    }
}
