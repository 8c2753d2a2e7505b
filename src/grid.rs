//! Row-major mapping between flat pixel indices and `(row, col)` coordinates.
//!
//! Every feature table row, every clusterer assignment vector and every
//! label grid shares this layout: flat index `i` is pixel
//! `(i / width, i % width)`.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::image::ImageArray;

/// Spatial dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub height: usize,
    pub width: usize,
}

impl GridShape {
    #[must_use]
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Spatial shape of an `(H, W, C)` image.
    #[must_use]
    pub fn of(image: &ImageArray) -> Self {
        let (height, width, _) = image.dim();
        Self { height, width }
    }

    /// Number of pixels.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.height * self.width
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of pixel `(row, col)`.
    #[must_use]
    pub const fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Pixel coordinates of a flat index.
    #[must_use]
    pub const fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Reshape a flat per-pixel assignment vector into an `(H, W)` grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] if `flat` does not hold one entry per pixel.
    pub fn to_grid<T>(&self, flat: Vec<T>) -> Result<Array2<T>> {
        let actual = flat.len();
        Array2::from_shape_vec((self.height, self.width), flat).map_err(|_| {
            Error::InvalidShape {
                expected: format!("{} values ({}x{})", self.len(), self.height, self.width),
                actual: format!("{actual} values"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_coords_inverse() {
        let shape = GridShape::new(3, 5);
        for i in 0..shape.len() {
            let (row, col) = shape.coords(i);
            assert!(row < 3 && col < 5);
            assert_eq!(shape.index(row, col), i);
        }
    }

    #[test]
    fn test_coords_use_integer_division() {
        let shape = GridShape::new(4, 3);
        assert_eq!(shape.coords(7), (2, 1));
        assert_eq!(shape.coords(11), (3, 2));
    }

    #[test]
    fn test_to_grid_row_major() {
        let shape = GridShape::new(2, 3);
        let grid = shape.to_grid(vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(grid[[0, 2]], 2);
        assert_eq!(grid[[1, 0]], 3);
    }

    #[test]
    fn test_to_grid_rejects_wrong_length() {
        let shape = GridShape::new(2, 2);
        assert!(matches!(
            shape.to_grid(vec![0usize; 3]),
            Err(Error::InvalidShape { .. })
        ));
    }
}
