//! Synthetic aerial-lot scenes shared by integration tests.

#![allow(dead_code)]

use parkalign::Image;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Grayscale scene of overlapping rectangles ("cars", markings) over a soft
/// gradient. Content is fully determined by `seed`.
pub fn lot_scene(width: usize, height: usize, seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data: Vec<u8> = (0..width * height)
        .map(|i| (40 + (i % width) * 40 / width + (i / width) * 30 / height) as u8)
        .collect();

    let count = width * height / 900;
    for _ in 0..count {
        let w = rng.random_range(6..28usize);
        let h = rng.random_range(6..28usize);
        let x0 = rng.random_range(0..width - w);
        let y0 = rng.random_range(0..height - h);
        let value: u8 = rng.random_range(0..=255);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                data[y * width + x] = value;
            }
        }
    }
    Image::gray(data, width, height).expect("valid scene")
}

/// Copies the `width x height` window starting at `(x0, y0)`.
pub fn crop(image: &Image, x0: usize, y0: usize, width: usize, height: usize) -> Image {
    let c = image.channels();
    let mut data = Vec::with_capacity(width * height * c);
    for y in y0..y0 + height {
        let start = (y * image.width() + x0) * c;
        data.extend_from_slice(&image.data()[start..start + width * c]);
    }
    Image::new(data, width, height, c).expect("valid crop")
}

/// Mean absolute difference over the rectangle `[x0, x1) x [y0, y1)`.
pub fn mean_abs_diff(a: &Image, b: &Image, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for y in y0..y1 {
        for x in x0..x1 {
            let pa = a.pixel(x, y).expect("in bounds")[0];
            let pb = b.pixel(x, y).expect("in bounds")[0];
            sum += f64::from(pa.abs_diff(pb));
            n += 1;
        }
    }
    sum / n as f64
}
