//! Pixel clustering in feature space.
//!
//! Both clusterers consume a [`FeatureTable`](crate::features::FeatureTable)
//! and produce a [`Clustering`] whose label grid uses every label in
//! `0..n_clusters` at least once.

mod kmeans;
mod mean_shift;

pub use kmeans::{kmeans, KMeansOptions};
pub use mean_shift::{mean_shift, MeanShiftOptions};

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::features::FeatureTable;

/// Per-pixel cluster labels of shape `(H, W)`.
pub type LabelGrid = Array2<usize>;

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster label of every pixel.
    pub labels: LabelGrid,
    /// Feature-space representative of each cluster `[n_clusters, M]`.
    pub centers: Array2<f64>,
    /// Number of refinement iterations run.
    pub n_iter: usize,
    /// Whether every convergence loop met its stopping criterion.
    pub converged: bool,
}

impl Clustering {
    /// Number of clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.centers.nrows()
    }
}

/// Euclidean distance between two feature vectors.
#[inline]
#[must_use]
pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Index of the center nearest to `point`; ties go to the lowest index.
#[must_use]
pub fn nearest(point: ArrayView1<'_, f64>, centers: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, center) in centers.axis_iter(Axis(0)).enumerate() {
        let dist = euclidean(point, center);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

/// Assign every feature row to its nearest center.
#[must_use]
pub fn assign_nearest(features: &FeatureTable, centers: &Array2<f64>) -> Array1<usize> {
    features
        .axis_iter(Axis(0))
        .map(|row| nearest(row, centers))
        .collect()
}

/// Drop centers no pixel is assigned to and renumber labels in order.
///
/// Returns the compacted labels and centers.
pub(crate) fn compact(
    assignments: Array1<usize>,
    centers: Array2<f64>,
) -> (Array1<usize>, Array2<f64>) {
    let k = centers.nrows();
    let mut used = vec![false; k];
    for &label in &assignments {
        used[label] = true;
    }
    if used.iter().all(|&u| u) {
        return (assignments, centers);
    }

    let mut remap = vec![usize::MAX; k];
    let mut kept = Vec::with_capacity(k);
    for (old, _) in used.iter().enumerate().filter(|(_, u)| **u) {
        remap[old] = kept.len();
        kept.push(old);
    }

    tracing::warn!(
        "Dropping {} empty cluster(s); {} remain",
        k - kept.len(),
        kept.len()
    );

    let centers = centers.select(Axis(0), &kept);
    let assignments = assignments.mapv(|label| remap[label]);
    (assignments, centers)
}
