//! Separable quadratic refinement of a 2D peak.

use crate::refine::quad1d::quad_peak_offset;

/// Returns the sub-pixel `(dx, dy)` offset of the peak at the center of a
/// 3x3 neighborhood `s[row][col]`.
///
/// `dx` is fitted along the center row and `dy` along the center column. An
/// axis whose fit is ill-conditioned contributes a zero offset.
pub(crate) fn refine_peak_offset_2d(s: [[f32; 3]; 3]) -> (f32, f32) {
    let dx = quad_peak_offset(s[1][0], s[1][1], s[1][2]).unwrap_or(0.0);
    let dy = quad_peak_offset(s[0][1], s[1][1], s[2][1]).unwrap_or(0.0);
    (dx, dy)
}
