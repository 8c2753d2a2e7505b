//! Image saving utilities.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::cluster::LabelGrid;
use crate::error::{Error, Result};

use super::{ImageArray, RGB_CHANNELS};

/// Save an `(H, W, 3)` array as an image file.
///
/// Values are rounded and clamped to `0..=255`. The format is inferred from
/// the extension; `quality` only applies to JPEG output.
///
/// # Errors
///
/// Returns an error if the array is not RGB or the image cannot be saved.
pub fn save_image<P: AsRef<Path>>(array: &ImageArray, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let img = DynamicImage::ImageRgb8(array_to_image(array)?);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Save a label grid as a 16-bit grayscale PNG holding the raw label values.
///
/// # Errors
///
/// Returns an error if a label does not fit in 16 bits or the file cannot be written.
#[allow(clippy::cast_possible_truncation)]
pub fn save_labels<P: AsRef<Path>>(labels: &LabelGrid, path: P) -> Result<()> {
    let path = path.as_ref();
    let (height, width) = labels.dim();
    let (w, h) = image_dims(width, height)?;

    let mut buf: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(w, h);
    for ((y, x), &label) in labels.indexed_iter() {
        let value = u16::try_from(label).map_err(|_| {
            Error::invalid_parameter("labels", format!("label {label} does not fit in 16 bits"))
        })?;
        buf.put_pixel(x as u32, y as u32, Luma([value]));
    }

    DynamicImage::ImageLuma16(buf)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}

/// Convert an `(H, W, 3)` array into an 8-bit RGB image.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] if the array does not have three channels.
#[allow(clippy::cast_possible_truncation)]
pub fn array_to_image(array: &ImageArray) -> Result<RgbImage> {
    let (height, width, channels) = array.dim();
    if channels != RGB_CHANNELS {
        return Err(Error::InvalidShape {
            expected: format!("{RGB_CHANNELS} channels"),
            actual: format!("{channels} channels"),
        });
    }
    let (w, h) = image_dims(width, height)?;

    // Safe: x and y are bounded by w and h, which were checked to fit in u32
    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        let (row, col) = (y as usize, x as usize);
        Rgb([
            to_u8(array[[row, col, 0]]),
            to_u8(array[[row, col, 1]]),
            to_u8(array[[row, col, 2]]),
        ])
    }))
}

fn image_dims(width: usize, height: usize) -> Result<(u32, u32)> {
    let too_large = |_| Error::InvalidShape {
        expected: "dimensions that fit in u32".to_string(),
        actual: format!("{width}x{height}"),
    };
    Ok((
        u32::try_from(width).map_err(too_large)?,
        u32::try_from(height).map_err(too_large)?,
    ))
}

/// Round and clamp a channel value into `0..=255`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::load_image;
    use ndarray::Array2;

    #[test]
    fn test_to_u8() {
        assert_eq!(to_u8(-3.0), 0);
        assert_eq!(to_u8(127.6), 128);
        assert_eq!(to_u8(300.0), 255);
    }

    #[test]
    fn test_rejects_non_rgb() {
        let array = ImageArray::zeros((2, 2, 4));
        assert!(matches!(
            array_to_image(&array),
            Err(Error::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");

        let mut array = ImageArray::zeros((2, 3, 3));
        array[[1, 2, 0]] = 200.0;
        array[[0, 1, 2]] = 17.0;
        save_image(&array, &path, 95).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, array);
    }

    #[test]
    fn test_save_labels_png16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.png");

        let labels = Array2::from_shape_vec((2, 2), vec![0usize, 1, 2, 300]).unwrap();
        save_labels(&labels, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_luma16();
        assert_eq!(decoded.get_pixel(1, 1)[0], 300);
        assert_eq!(decoded.get_pixel(0, 1)[0], 2);
    }

    #[test]
    fn test_save_labels_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let labels = Array2::from_elem((1, 1), 70_000usize);
        assert!(matches!(
            save_labels(&labels, dir.path().join("labels.png")),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
