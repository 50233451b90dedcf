//! Quadratic 1D peak interpolation.

/// Estimates the sub-sample offset of a peak from three samples.
///
/// Samples are taken at `-1, 0, +1` (`fm`, `f0`, `fp`). The parabola through
/// them must be concave and its vertex must fall within one sample of the
/// center; otherwise `None` is returned.
pub(crate) fn quad_peak_offset(fm: f32, f0: f32, fp: f32) -> Option<f32> {
    if !fm.is_finite() || !f0.is_finite() || !fp.is_finite() {
        return None;
    }

    let curvature = fm - 2.0 * f0 + fp;
    if curvature >= -1e-6 {
        return None;
    }

    let dx = 0.5 * (fm - fp) / curvature;
    (dx.is_finite() && dx.abs() <= 1.0).then_some(dx)
}

#[cfg(test)]
mod tests {
    use super::quad_peak_offset;

    #[test]
    fn symmetric_samples_have_no_offset() {
        let dx = quad_peak_offset(0.9, 1.0, 0.9).unwrap();
        assert!(dx.abs() < 1e-6);
    }

    #[test]
    fn shifted_parabola_is_recovered() {
        let f = |x: f32| 4.0 - (x + 0.4).powi(2);
        let dx = quad_peak_offset(f(-1.0), f(0.0), f(1.0)).unwrap();
        assert!((dx + 0.4).abs() < 1e-5);
    }

    #[test]
    fn flat_or_convex_samples_are_rejected() {
        assert!(quad_peak_offset(1.0, 1.0, 1.0).is_none());
        assert!(quad_peak_offset(2.0, 0.5, 2.0).is_none());
    }
}
