//! Owned images, borrowed plane views and pyramid utilities.
//!
//! [`Image`] is the interleaved 8-bit buffer the pipeline passes between
//! stages: one channel (grayscale) or three (color, channel order is up to the
//! caller). [`ImageView`] is a borrowed single-plane 2D view with an explicit
//! stride; the stride counts elements between consecutive row starts, so a
//! stride larger than the width represents padded rows.

use crate::util::{ParkAlignError, ParkAlignResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Borrowed single-plane 2D view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ParkAlignResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> ParkAlignResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ParkAlignError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Borrows a sub-rectangle without copying; the stride is preserved.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> ParkAlignResult<Self> {
        let out_of_bounds = ParkAlignError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
        };
        if width == 0 || height == 0 {
            return Err(ParkAlignError::InvalidDimensions { width, height });
        }
        let fits = x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits {
            return Err(out_of_bounds);
        }
        let start = y * self.stride + x;
        Ok(Self {
            data: &self.data[start..],
            width,
            height,
            stride: self.stride,
        })
    }

    /// Returns row `y` as a slice of length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Returns the element at `(x, y)` with coordinates clamped to the border.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> T {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.stride + cx]
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ParkAlignResult<usize> {
    if width == 0 || height == 0 {
        return Err(ParkAlignError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ParkAlignError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ParkAlignError::InvalidDimensions { width, height })
}

/// Owned, immutable, interleaved 8-bit image with one or three channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Image {
    /// Wraps an interleaved buffer of exactly `width * height * channels` bytes.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
    ) -> ParkAlignResult<Self> {
        if channels != 1 && channels != 3 {
            return Err(ParkAlignError::InvalidChannels { channels });
        }
        if width == 0 || height == 0 {
            return Err(ParkAlignError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(ParkAlignError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ParkAlignError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(ParkAlignError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Wraps a single-channel buffer.
    pub fn gray(data: Vec<u8>, width: usize, height: usize) -> ParkAlignResult<Self> {
        Self::new(data, width, height, 1)
    }

    /// Wraps a three-channel interleaved buffer.
    pub fn rgb(data: Vec<u8>, width: usize, height: usize) -> ParkAlignResult<Self> {
        Self::new(data, width, height, 3)
    }

    /// Creates an image filled with `value`.
    pub fn filled(
        width: usize,
        height: usize,
        channels: usize,
        value: u8,
    ) -> ParkAlignResult<Self> {
        let len = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(ParkAlignError::InvalidDimensions { width, height })?;
        Self::new(vec![value; len], width, height, channels)
    }

    /// Assembles an image whose buffer length is already known to be consistent.
    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels (1 or 3).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the raw interleaved buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image and returns its buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the channel values of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }

    /// Returns a single-channel copy using BT.601 luma weights.
    ///
    /// Grayscale inputs are cloned unchanged.
    pub fn to_luma(&self) -> Image {
        if self.channels == 1 {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(3)
            .map(|px| {
                let y = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
                ((y + 500) / 1000) as u8
            })
            .collect();
        Image::from_parts(data, self.width, self.height, 1)
    }

    /// Returns a three-channel copy; grayscale values are replicated.
    pub fn to_rgb(&self) -> Image {
        if self.channels == 3 {
            return self.clone();
        }
        let data = self.data.iter().flat_map(|&v| [v, v, v]).collect();
        Image::from_parts(data, self.width, self.height, 3)
    }

    /// Borrows a single-channel image as a plane view.
    pub fn plane(&self) -> ParkAlignResult<ImageView<'_, u8>> {
        if self.channels != 1 {
            return Err(ParkAlignError::InvalidChannels {
                channels: self.channels,
            });
        }
        Ok(ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        })
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
