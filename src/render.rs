//! Recolor an image by replacing each pixel with its cluster's average color.

use ndarray::Array2;

use crate::cluster::LabelGrid;
use crate::error::{Error, Result};
use crate::image::{ImageArray, RGB_CHANNELS};

/// Replace every pixel with the per-channel mean color of its cluster.
///
/// The number of clusters is `max(label) + 1`; every label in that range
/// must be used by at least one pixel.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] if the image is not RGB or the label grid
/// does not match its spatial shape, and [`Error::EmptyCluster`] if a label
/// in range has no pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn render_clusters(image: &ImageArray, labels: &LabelGrid) -> Result<ImageArray> {
    let (height, width, channels) = image.dim();
    if channels != RGB_CHANNELS || labels.dim() != (height, width) {
        let (label_h, label_w) = labels.dim();
        return Err(Error::InvalidShape {
            expected: format!("({height}, {width}) labels for a ({height}, {width}, {RGB_CHANNELS}) image"),
            actual: format!("({label_h}, {label_w}) labels, {channels} channels"),
        });
    }

    let n_clusters = labels.iter().max().map_or(0, |&max| max + 1);
    let mut sums = Array2::<f64>::zeros((n_clusters, RGB_CHANNELS));
    let mut counts = vec![0usize; n_clusters];

    for ((row, col), &label) in labels.indexed_iter() {
        counts[label] += 1;
        for c in 0..RGB_CHANNELS {
            sums[[label, c]] += f64::from(image[[row, col, c]]);
        }
    }

    if let Some(cluster) = counts.iter().position(|&count| count == 0) {
        return Err(Error::EmptyCluster { cluster });
    }

    for (mut sum, &count) in sums.rows_mut().into_iter().zip(&counts) {
        sum /= count as f64;
    }

    let mut out = ImageArray::zeros(image.raw_dim());
    for ((row, col), &label) in labels.indexed_iter() {
        for c in 0..RGB_CHANNELS {
            out[[row, col, c]] = sums[[label, c]] as f32;
        }
    }

    Ok(out)
}
