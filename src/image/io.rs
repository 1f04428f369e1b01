//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::color::ColorImage;
use crate::image::frame::{ChannelOrder, Frame};
use crate::image::OwnedImage;
use crate::util::{BoardSightError, BoardSightResult};
use std::path::Path;

/// File extensions accepted as template or screenshot images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Returns true when `path` has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Converts a decoded image to grayscale with the frame luma weights.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> BoardSightResult<OwnedImage> {
    let rgb = img.to_rgb8();
    Frame::new(rgb.as_raw(), rgb.width() as usize, rgb.height() as usize, 3).to_gray()
}

/// Loads an image from disk and converts it to a grayscale owned image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> BoardSightResult<OwnedImage> {
    let img = image::open(path).map_err(|err| BoardSightError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Loads an image from disk as R, G, B planes.
pub fn load_color_image<P: AsRef<Path>>(path: P) -> BoardSightResult<ColorImage> {
    let img = image::open(path).map_err(|err| BoardSightError::ImageIo {
        reason: err.to_string(),
    })?;
    let rgb = img.to_rgb8();
    ColorImage::from_interleaved(
        rgb.as_raw(),
        rgb.width() as usize,
        rgb.height() as usize,
        3,
        ChannelOrder::Rgb,
    )
}

/// Writes a grayscale image as PNG/JPEG/BMP depending on the extension.
pub fn save_gray_image<P: AsRef<Path>>(img: &OwnedImage, path: P) -> BoardSightResult<()> {
    let buffer = image::GrayImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.data().to_vec(),
    )
    .ok_or(BoardSightError::BufferTooSmall {
        needed: img.width() * img.height(),
        got: img.data().len(),
    })?;
    buffer.save(path).map_err(|err| BoardSightError::ImageIo {
        reason: err.to_string(),
    })
}
