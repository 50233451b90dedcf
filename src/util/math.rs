//! Numeric helpers shared by the feature and geometry stages.

use std::f32::consts::TAU;

/// Wraps an angle in radians to the range [0, 2π).
pub(crate) fn wrap_rad(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Builds a normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`.
pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}
