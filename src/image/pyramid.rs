//! Box-filter image pyramid over single-channel images.
//!
//! Downsampling averages each 2x2 block with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. The result is deterministic and free of
//! floating point, so repeated extractions see bit-identical levels.

use crate::image::{Image, ImageView};

/// Owned grayscale pyramid; level 0 is the base resolution.
pub struct ImagePyramid {
    levels: Vec<Image>,
}

impl ImagePyramid {
    /// Builds up to `max_levels` levels from the luma of `base`.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present. Construction stops early once the next level would have a
    /// side shorter than `min_side`.
    pub fn build(base: &Image, max_levels: usize, min_side: usize) -> Self {
        let max_levels = max_levels.max(1);
        let mut levels = Vec::with_capacity(max_levels);
        levels.push(base.to_luma());

        while levels.len() < max_levels {
            let Some(prev) = levels.last() else {
                break;
            };
            let dst_width = prev.width() / 2;
            let dst_height = prev.height() / 2;
            if dst_width < min_side.max(1) || dst_height < min_side.max(1) {
                break;
            }
            let next = match prev.plane() {
                Ok(src) => downsample_2x2(src, dst_width, dst_height),
                Err(_) => break,
            };
            levels.push(next);
        }

        Self { levels }
    }

    /// Returns all pyramid levels.
    pub fn levels(&self) -> &[Image] {
        &self.levels
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false: the base level is always present.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns a plane view of a specific level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).and_then(|level| level.plane().ok())
    }
}

fn downsample_2x2(src: ImageView<'_, u8>, dst_width: usize, dst_height: usize) -> Image {
    let mut dst = vec![0u8; dst_width * dst_height];
    for y in 0..dst_height {
        let (Some(row0), Some(row1)) = (src.row(y * 2), src.row(y * 2 + 1)) else {
            continue;
        };
        let out = &mut dst[y * dst_width..(y + 1) * dst_width];
        for (x, value) in out.iter_mut().enumerate() {
            let sum = u16::from(row0[2 * x])
                + u16::from(row0[2 * x + 1])
                + u16::from(row1[2 * x])
                + u16::from(row1[2 * x + 1]);
            *value = ((sum + 2) / 4) as u8;
        }
    }
    Image::from_parts(dst, dst_width, dst_height, 1)
}
