//! Squared Euclidean distance between descriptors.
//!
//! With the `simd` feature the 128 lanes are processed eight at a time using
//! `wide::f32x8`; the scalar path is used otherwise.

use crate::features::Descriptor;

/// Squared Euclidean distance, scalar implementation.
#[inline]
pub fn l2_squared_scalar(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(feature = "simd")]
mod simd {
    use crate::features::Descriptor;
    use wide::f32x8;

    const LANES: usize = 8;

    #[inline]
    fn load(slice: &[f32]) -> f32x8 {
        f32x8::from([
            slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
        ])
    }

    /// Squared Euclidean distance, `f32x8` implementation.
    #[inline]
    pub fn l2_squared_simd(a: &Descriptor, b: &Descriptor) -> f32 {
        let mut acc = f32x8::ZERO;
        for (ca, cb) in a.chunks_exact(LANES).zip(b.chunks_exact(LANES)) {
            let d = load(ca) - load(cb);
            acc += d * d;
        }
        acc.to_array().iter().sum()
    }
}

#[cfg(feature = "simd")]
pub use simd::l2_squared_simd;

/// Squared Euclidean distance using the fastest available implementation.
#[inline]
pub fn l2_squared(a: &Descriptor, b: &Descriptor) -> f32 {
    #[cfg(feature = "simd")]
    {
        l2_squared_simd(a, b)
    }
    #[cfg(not(feature = "simd"))]
    {
        l2_squared_scalar(a, b)
    }
}
