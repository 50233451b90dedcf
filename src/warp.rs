//! Perspective warping of live images into the master frame.
//!
//! Destination pixels use integer coordinates. Each one is mapped through the
//! inverse homography and bilinearly sampled when the source point lies
//! inside `[0, w-1] x [0, h-1]`; otherwise it receives the background value.

use crate::geometry::Homography;
use crate::image::Image;
use crate::trace::{trace_span, trace_warn};
use crate::util::{ParkAlignError, ParkAlignResult};
use nalgebra::{Matrix3, Vector3};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Warps images with a configurable background value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageWarper {
    /// Value written to every channel of unmapped pixels.
    pub background: u8,
    /// Warp rows in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl ImageWarper {
    pub fn new(background: u8) -> Self {
        Self {
            background,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Resamples `source` into a `width x height` image in the frame that
    /// `homography` maps into.
    ///
    /// Fails on a zero target size, or when the transform cannot be inverted
    /// numerically.
    pub fn warp(
        &self,
        source: &Image,
        homography: &Homography,
        width: usize,
        height: usize,
    ) -> ParkAlignResult<Image> {
        let _span = trace_span!("warp_perspective", width = width, height = height).entered();
        if width == 0 || height == 0 {
            return Err(ParkAlignError::InvalidDimensions { width, height });
        }

        let inv = invert(homography.matrix())?;
        let channels = source.channels();
        let row_len = width * channels;
        let mut out = vec![self.background; row_len * height];

        let fill_row = |(y, row): (usize, &mut [u8])| {
            warp_row(source, &inv, y, row);
        };

        #[cfg(feature = "rayon")]
        if self.parallel {
            out.par_chunks_mut(row_len).enumerate().for_each(fill_row);
            return Ok(Image::from_parts(out, width, height, channels));
        }

        out.chunks_mut(row_len).enumerate().for_each(fill_row);
        Ok(Image::from_parts(out, width, height, channels))
    }
}

/// Destination-to-source mapping for `h`.
fn invert(h: &Matrix3<f64>) -> ParkAlignResult<Matrix3<f64>> {
    match h.try_inverse() {
        Some(inv) if inv.iter().all(|v| v.is_finite()) => Ok(inv),
        _ => {
            trace_warn!("singular_inverse", det = h.determinant());
            Err(ParkAlignError::NonInvertibleTransform)
        }
    }
}

fn warp_row(source: &Image, inv: &Matrix3<f64>, y: usize, row: &mut [u8]) {
    let channels = source.channels();
    let max_x = (source.width() - 1) as f64;
    let max_y = (source.height() - 1) as f64;

    for (x, px) in row.chunks_exact_mut(channels).enumerate() {
        let v = inv * Vector3::new(x as f64, y as f64, 1.0);
        let w = v[2];
        if !(w > 0.0) {
            continue;
        }
        let sx = v[0] / w;
        let sy = v[1] / w;
        if !(sx >= 0.0 && sy >= 0.0 && sx <= max_x && sy <= max_y) {
            continue;
        }
        sample_bilinear(source, sx, sy, px);
    }
}

/// Bilinear sample of all channels at an in-bounds location.
#[inline]
fn sample_bilinear(source: &Image, x: f64, y: f64, out: &mut [u8]) {
    let channels = source.channels();
    let width = source.width();
    let data = source.data();

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(source.height() - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let at = |xx: usize, yy: usize, c: usize| f64::from(data[(yy * width + xx) * channels + c]);
    for (c, value) in out.iter_mut().enumerate() {
        let top = at(x0, y0, c) * (1.0 - fx) + at(x1, y0, c) * fx;
        let bottom = at(x0, y1, c) * (1.0 - fx) + at(x1, y1, c) * fx;
        let v = top * (1.0 - fy) + bottom * fy;
        *value = (v + 0.5).clamp(0.0, 255.0) as u8;
    }
}

/// Warps `source` into a `width x height` image with a black background.
pub fn warp_perspective(
    source: &Image,
    homography: &Homography,
    width: usize,
    height: usize,
) -> ParkAlignResult<Image> {
    ImageWarper::default().warp(source, homography, width, height)
}
