//! Orientation assignment and gradient-histogram descriptors.
//!
//! The descriptor samples a 16x16 grid around the keypoint, rotated to the
//! keypoint's dominant orientation, and accumulates gradient magnitude into
//! 4x4 spatial cells with 8 orientation bins each (trilinear voting). The
//! 128-vector is L2-normalized, clipped at 0.2 and renormalized, which damps
//! the influence of a few very strong edges such as painted lane markings.

use crate::features::filter::FloatPlane;
use crate::refine::quad1d::quad_peak_offset;
use crate::util::math::wrap_rad;
use std::f32::consts::TAU;

/// Number of `f32` elements in a descriptor.
pub const DESCRIPTOR_LEN: usize = CELLS * CELLS * ORI_BINS_DESC;

/// Descriptor vector.
pub type Descriptor = [f32; DESCRIPTOR_LEN];

const CELLS: usize = 4;
const CELL_SIZE: usize = 4;
const ORI_BINS_DESC: usize = 8;
const PATCH: usize = CELLS * CELL_SIZE;
const CLIP: f32 = 0.2;

const ORI_BINS: usize = 36;
const ORI_RADIUS: isize = 8;
const ORI_SIGMA: f32 = 4.0;

/// Minimum distance from the level border for a full descriptor patch.
pub(crate) const PATCH_MARGIN: usize = 12;

/// Dominant gradient orientation around `(x, y)` in radians, in [0, 2π).
pub(crate) fn dominant_orientation(gx: &FloatPlane, gy: &FloatPlane, x: f32, y: f32) -> f32 {
    let cx = x.round() as isize;
    let cy = y.round() as isize;
    let denom = 2.0 * ORI_SIGMA * ORI_SIGMA;

    let mut hist = [0.0f32; ORI_BINS];
    for dy in -ORI_RADIUS..=ORI_RADIUS {
        for dx in -ORI_RADIUS..=ORI_RADIUS {
            let r2 = dx * dx + dy * dy;
            if r2 > ORI_RADIUS * ORI_RADIUS {
                continue;
            }
            let gxv = gx.get_clamped(cx + dx, cy + dy);
            let gyv = gy.get_clamped(cx + dx, cy + dy);
            let mag = gxv.hypot(gyv);
            if mag <= 0.0 {
                continue;
            }
            let weight = (-(r2 as f32) / denom).exp();
            let angle = wrap_rad(gyv.atan2(gxv));
            let bin = ((angle / TAU) * ORI_BINS as f32) as usize % ORI_BINS;
            hist[bin] += weight * mag;
        }
    }

    let mut smooth = [0.0f32; ORI_BINS];
    for (i, value) in smooth.iter_mut().enumerate() {
        let prev = hist[(i + ORI_BINS - 1) % ORI_BINS];
        let next = hist[(i + 1) % ORI_BINS];
        *value = 0.25 * prev + 0.5 * hist[i] + 0.25 * next;
    }

    let mut best = 0usize;
    for i in 1..ORI_BINS {
        if smooth[i] > smooth[best] {
            best = i;
        }
    }
    if smooth[best] <= 0.0 {
        return 0.0;
    }
    let prev = smooth[(best + ORI_BINS - 1) % ORI_BINS];
    let next = smooth[(best + 1) % ORI_BINS];
    let offset = quad_peak_offset(prev, smooth[best], next).unwrap_or(0.0);
    wrap_rad((best as f32 + 0.5 + offset) * TAU / ORI_BINS as f32)
}

/// Computes the rotated gradient-histogram descriptor at `(x, y)`.
pub(crate) fn describe(gx: &FloatPlane, gy: &FloatPlane, x: f32, y: f32, angle: f32) -> Descriptor {
    let (sin, cos) = angle.sin_cos();
    let half = PATCH as f32 * 0.5;
    let denom = 2.0 * half * half;
    let mut hist = [0.0f32; DESCRIPTOR_LEN];

    for i in 0..PATCH {
        for j in 0..PATCH {
            let u = j as f32 + 0.5 - half;
            let v = i as f32 + 0.5 - half;
            let sx = x + cos * u - sin * v;
            let sy = y + sin * u + cos * v;

            let gxs = gx.sample_bilinear(sx, sy);
            let gys = gy.sample_bilinear(sx, sy);
            let ru = cos * gxs + sin * gys;
            let rv = -sin * gxs + cos * gys;
            let mag = ru.hypot(rv);
            if mag <= 0.0 {
                continue;
            }
            let weight = mag * (-(u * u + v * v) / denom).exp();
            let theta = wrap_rad(rv.atan2(ru));

            let cu = (j as f32 + 0.5) / CELL_SIZE as f32 - 0.5;
            let cv = (i as f32 + 0.5) / CELL_SIZE as f32 - 0.5;
            let ob = theta / TAU * ORI_BINS_DESC as f32;
            let (cu0, cv0, ob0) = (cu.floor(), cv.floor(), ob.floor());
            let (fu, fv, fo) = (cu - cu0, cv - cv0, ob - ob0);

            for (du, wu) in [(0isize, 1.0 - fu), (1, fu)] {
                let cell_x = cu0 as isize + du;
                if cell_x < 0 || cell_x >= CELLS as isize {
                    continue;
                }
                for (dv, wv) in [(0isize, 1.0 - fv), (1, fv)] {
                    let cell_y = cv0 as isize + dv;
                    if cell_y < 0 || cell_y >= CELLS as isize {
                        continue;
                    }
                    let base = (cell_y as usize * CELLS + cell_x as usize) * ORI_BINS_DESC;
                    for (d_o, wo) in [(0usize, 1.0 - fo), (1, fo)] {
                        let bin = (ob0 as usize + d_o) % ORI_BINS_DESC;
                        hist[base + bin] += weight * wu * wv * wo;
                    }
                }
            }
        }
    }

    normalize_clip(&mut hist);
    hist
}

fn normalize_clip(hist: &mut Descriptor) {
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    for v in hist.iter_mut() {
        *v = (*v / norm).min(CLIP);
    }
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in hist.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::filter::{gaussian_blur, sobel};
    use crate::image::Image;

    fn plane_from_fn(size: usize, f: impl Fn(usize, usize) -> u8) -> FloatPlane {
        let data = (0..size * size).map(|i| f(i % size, i / size)).collect();
        let img = Image::gray(data, size, size).unwrap();
        gaussian_blur(&FloatPlane::from_u8(img.plane().unwrap()), 1.0)
    }

    #[test]
    fn orientation_follows_gradient_direction() {
        // Intensity increases with x: gradient points along +x (angle ~ 0).
        let plane = plane_from_fn(48, |x, _| (x * 4) as u8);
        let (gx, gy) = sobel(&plane);
        let angle = dominant_orientation(&gx, &gy, 24.0, 24.0);
        let dist = angle.min(TAU - angle);
        assert!(dist < 0.2, "angle {angle}");

        // Intensity increases with y: gradient along +y (angle ~ π/2).
        let plane = plane_from_fn(48, |_, y| (y * 4) as u8);
        let (gx, gy) = sobel(&plane);
        let angle = dominant_orientation(&gx, &gy, 24.0, 24.0);
        assert!((angle - TAU / 4.0).abs() < 0.2, "angle {angle}");
    }

    #[test]
    fn descriptor_is_unit_length_and_non_negative() {
        let plane = plane_from_fn(48, |x, y| (((x / 6) + (y / 5)) % 2 * 200) as u8);
        let (gx, gy) = sobel(&plane);
        let d = describe(&gx, &gy, 24.0, 24.0, 0.3);
        let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(d.iter().all(|&v| v.is_finite() && v >= 0.0));
    }

    #[test]
    fn flat_patch_gives_zero_descriptor() {
        let plane = plane_from_fn(48, |_, _| 90);
        let (gx, gy) = sobel(&plane);
        let d = describe(&gx, &gy, 24.0, 24.0, 0.0);
        assert!(d.iter().all(|&v| v == 0.0));
    }
}
