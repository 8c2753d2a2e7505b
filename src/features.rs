//! Per-pixel feature vectors combining position and color.

use ndarray::{Array2, Axis};

use crate::error::{Error, Result};
use crate::grid::GridShape;
use crate::image::{ImageArray, RGB_CHANNELS};

/// Feature table of shape `(H * W, M)`, one row per pixel in row-major order.
pub type FeatureTable = Array2<f64>;

/// Number of features per pixel: row, col and three color channels.
pub const FEATURE_DIM: usize = 2 + RGB_CHANNELS;

/// Build the normalized spatial-color feature table of an image.
///
/// Row `row * W + col` holds `[row, col, c0, c1, c2]`. Each column is then
/// divided by its maximum over the whole table so every feature lies in
/// `[0, 1]` for non-negative input. Columns whose maximum is zero are left
/// at zero.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] if the image is empty or not three-channel.
#[allow(clippy::cast_precision_loss)]
pub fn build_features(image: &ImageArray) -> Result<FeatureTable> {
    check_image(image)?;

    let shape = GridShape::of(image);
    let mut features = FeatureTable::zeros((shape.len(), FEATURE_DIM));

    for row in 0..shape.height {
        for col in 0..shape.width {
            let mut feature = features.row_mut(shape.index(row, col));
            feature[0] = row as f64;
            feature[1] = col as f64;
            for c in 0..RGB_CHANNELS {
                feature[2 + c] = f64::from(image[[row, col, c]]);
            }
        }
    }

    for mut column in features.axis_iter_mut(Axis(1)) {
        let max = column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        if max != 0.0 {
            column.mapv_inplace(|v| v / max);
        }
    }

    Ok(features)
}

/// Check that a feature table has one row per pixel of `shape`.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] on a row count mismatch or an empty table.
pub fn check_table(shape: GridShape, features: &FeatureTable) -> Result<()> {
    let (rows, cols) = features.dim();
    if shape.is_empty() || rows != shape.len() || cols == 0 {
        return Err(Error::InvalidShape {
            expected: format!(
                "feature table with {} rows ({}x{} pixels)",
                shape.len(),
                shape.height,
                shape.width
            ),
            actual: format!("{rows}x{cols} table"),
        });
    }
    Ok(())
}

fn check_image(image: &ImageArray) -> Result<()> {
    let (height, width, channels) = image.dim();
    if channels != RGB_CHANNELS || height == 0 || width == 0 {
        return Err(Error::InvalidShape {
            expected: format!("non-empty (H, W, {RGB_CHANNELS}) image"),
            actual: format!("({height}, {width}, {channels})"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_order() {
        let mut image = ImageArray::zeros((2, 3, 3));
        image[[1, 2, 0]] = 50.0;
        image[[0, 1, 1]] = 100.0;

        let features = build_features(&image).unwrap();
        assert_eq!(features.dim(), (6, 5));

        // Pixel (1, 2) is the last row and holds the maxima of row, col and channel 0.
        let last = features.row(5);
        assert_eq!(last[0], 1.0);
        assert_eq!(last[1], 1.0);
        assert_eq!(last[2], 1.0);

        // Pixel (0, 1)
        let p = features.row(1);
        assert_eq!(p[0], 0.0);
        assert!((p[1] - 0.5).abs() < 1e-12);
        assert_eq!(p[3], 1.0);
    }

    #[test]
    fn test_normalized_range() {
        let image = ImageArray::from_shape_fn((4, 5, 3), |(r, c, ch)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (r * 31 + c * 7 + ch * 13) as f32;
            v
        });
        let features = build_features(&image).unwrap();

        for column in features.axis_iter(Axis(1)) {
            let max = column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            assert!((max - 1.0).abs() < 1e-12);
            assert!(column.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_zero_column_stays_zero() {
        // Single row and black image: row and color columns are all zero.
        let image = ImageArray::zeros((1, 4, 3));
        let features = build_features(&image).unwrap();

        assert!(features.iter().all(|v| v.is_finite()));
        assert_eq!(features.column(0).sum(), 0.0);
        assert_eq!(features.column(2).sum(), 0.0);
    }

    #[test]
    fn test_rejects_non_rgb() {
        let image = ImageArray::zeros((2, 2, 4));
        assert!(matches!(
            build_features(&image),
            Err(Error::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_check_table_row_mismatch() {
        let features = FeatureTable::zeros((5, FEATURE_DIM));
        assert!(check_table(GridShape::new(2, 2), &features).is_err());
        assert!(check_table(GridShape::new(1, 5), &features).is_ok());
    }
}
