//! Conversions between [`Image`] and the `image` crate, plus file helpers.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::Image;
use crate::util::{ParkAlignError, ParkAlignResult};
use image::{ColorType, DynamicImage, GrayImage, ImageReader, RgbImage};
use std::path::Path;

/// Converts a decoded image, keeping grayscale sources single-channel.
pub fn image_from_dynamic(img: &DynamicImage) -> ParkAlignResult<Image> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            Image::gray(img.to_luma8().into_raw(), width, height)
        }
        _ => Image::rgb(img.to_rgb8().into_raw(), width, height),
    }
}

/// Converts an [`Image`] into a `DynamicImage` for encoding.
pub fn image_to_dynamic(img: &Image) -> ParkAlignResult<DynamicImage> {
    let width = img.width() as u32;
    let height = img.height() as u32;
    let data = img.data().to_vec();
    let dynamic = match img.channels() {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
    };
    dynamic.ok_or(ParkAlignError::BufferTooSmall {
        needed: img.width() * img.height() * img.channels(),
        got: img.data().len(),
    })
}

/// Loads and decodes an image file; the format is sniffed from the content,
/// so a mislabeled extension still decodes.
pub fn load_image<P: AsRef<Path>>(path: P) -> ParkAlignResult<Image> {
    let path = path.as_ref();
    let io_err = |err: &dyn std::fmt::Display| ParkAlignError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    };
    let img = ImageReader::open(path)
        .map_err(|err| io_err(&err))?
        .with_guessed_format()
        .map_err(|err| io_err(&err))?
        .decode()
        .map_err(|err| io_err(&err))?;
    image_from_dynamic(&img)
}

/// Encodes an image; the format follows the file extension.
pub fn save_image<P: AsRef<Path>>(img: &Image, path: P) -> ParkAlignResult<()> {
    image_to_dynamic(img)?
        .save(path.as_ref())
        .map_err(|err| ParkAlignError::ImageIo {
            reason: format!("{}: {err}", path.as_ref().display()),
        })
}
