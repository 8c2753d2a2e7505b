//! Image loading utilities.

use std::path::Path;

use image::DynamicImage;

use crate::error::{Error, Result};

use super::{ImageArray, RGB_CHANNELS};

/// Load an image from disk as an `(H, W, 3)` array.
///
/// The image is converted to 8-bit RGB; channel values are kept in `0..=255`.
///
/// # Errors
///
/// Returns an error if the image cannot be loaded or decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageArray> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "Loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );

    Ok(image_to_array(&img))
}

/// Convert a `DynamicImage` into an `(H, W, 3)` array.
#[must_use]
pub fn image_to_array(img: &DynamicImage) -> ImageArray {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    let mut array = ImageArray::zeros((height, width, RGB_CHANNELS));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..RGB_CHANNELS {
            array[[y as usize, x as usize, c]] = f32::from(pixel[c]);
        }
    }

    array
}
