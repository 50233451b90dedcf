//! Floating-point planes and the separable filters used by corner detection.

use crate::image::ImageView;
use crate::util::math::gaussian_kernel;

/// Owned single-channel `f32` buffer, row-major without padding.
#[derive(Clone, Debug)]
pub(crate) struct FloatPlane {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl FloatPlane {
    pub(crate) fn zeros(width: usize, height: usize) -> Self {
        Self {
            data: vec![0.0; width * height],
            width,
            height,
        }
    }

    pub(crate) fn from_u8(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            if let Some(row) = view.row(y) {
                data.extend(row.iter().map(|&v| f32::from(v)));
            }
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Reads with coordinates clamped to the border.
    #[inline]
    pub(crate) fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// Bilinear sample with border clamping.
    #[inline]
    pub(crate) fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as isize, y0 as isize);

        let p00 = self.get_clamped(xi, yi);
        let p10 = self.get_clamped(xi + 1, yi);
        let p01 = self.get_clamped(xi, yi + 1);
        let p11 = self.get_clamped(xi + 1, yi + 1);

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }

    pub(crate) fn zip_map(&self, other: &FloatPlane, f: impl Fn(f32, f32) -> f32) -> FloatPlane {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        FloatPlane {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Separable Gaussian blur with replicated borders.
pub(crate) fn gaussian_blur(src: &FloatPlane, sigma: f32) -> FloatPlane {
    let kernel = gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return src.clone();
    }
    let radius = (kernel.len() / 2) as isize;
    let (w, h) = (src.width, src.height);

    let mut tmp = FloatPlane::zeros(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &wk) in kernel.iter().enumerate() {
                acc += wk * src.get_clamped(x as isize + k as isize - radius, y as isize);
            }
            tmp.set(x, y, acc);
        }
    }

    let mut out = FloatPlane::zeros(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &wk) in kernel.iter().enumerate() {
                acc += wk * tmp.get_clamped(x as isize, y as isize + k as isize - radius);
            }
            out.set(x, y, acc);
        }
    }
    out
}

/// 3x3 Sobel derivatives scaled by 1/8 so they approximate the per-pixel slope.
pub(crate) fn sobel(src: &FloatPlane) -> (FloatPlane, FloatPlane) {
    let (w, h) = (src.width, src.height);
    let mut gx = FloatPlane::zeros(w, h);
    let mut gy = FloatPlane::zeros(w, h);
    for y in 0..h as isize {
        for x in 0..w as isize {
            let p = |dx: isize, dy: isize| src.get_clamped(x + dx, y + dy);
            let dx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let dy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            gx.set(x as usize, y as usize, dx * 0.125);
            gy.set(x as usize, y as usize, dy * 0.125);
        }
    }
    (gx, gy)
}
