//! K-Means clustering of pixel feature vectors.
//!
//! Lloyd iterations from centroids sampled uniformly (with replacement)
//! among the feature rows. A run stops once an update leaves the centroid
//! set exactly unchanged, or when `max_iter` is reached.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use crate::error::{Error, Result};
use crate::features::{check_table, FeatureTable};
use crate::grid::GridShape;

use super::{assign_nearest, compact, euclidean, Clustering};

/// Options for K-Means clustering.
#[derive(Debug, Clone)]
pub struct KMeansOptions {
    /// Number of clusters `K`.
    pub n_clusters: usize,
    /// Maximum iterations per run.
    pub max_iter: usize,
    /// Number of random restarts; the run with the lowest inertia is kept.
    pub n_init: usize,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            max_iter: 300,
            n_init: 1,
        }
    }
}

impl KMeansOptions {
    /// Options for `n_clusters` clusters with default limits.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Self::default()
        }
    }

    fn validate(&self, n_points: usize) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::invalid_parameter("n_clusters", "must be greater than 0"));
        }
        if self.n_clusters > n_points {
            return Err(Error::invalid_parameter(
                "n_clusters",
                format!(
                    "{} exceeds the number of pixels {n_points}",
                    self.n_clusters
                ),
            ));
        }
        if self.max_iter == 0 {
            return Err(Error::invalid_parameter("max_iter", "must be greater than 0"));
        }
        if self.n_init == 0 {
            return Err(Error::invalid_parameter("n_init", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Partition pixels into `K` clusters by iterative centroid refinement.
///
/// # Arguments
///
/// * `shape` - Spatial shape of the source image
/// * `features` - Feature table with one row per pixel, row-major
/// * `options` - Cluster count and iteration limits
/// * `rng` - Random source for centroid seeding
///
/// # Errors
///
/// Returns an error if the table does not match `shape` or the options are invalid.
/// Hitting `max_iter` is not an error; it is reported through
/// [`Clustering::converged`].
pub fn kmeans<R: Rng + ?Sized>(
    shape: GridShape,
    features: &FeatureTable,
    options: &KMeansOptions,
    rng: &mut R,
) -> Result<Clustering> {
    check_table(shape, features)?;
    options.validate(features.nrows())?;

    let mut best: Option<(f64, Clustering)> = None;
    for run in 0..options.n_init {
        let (inertia, result) = kmeans_single(shape, features, options, rng)?;
        tracing::debug!(
            "K-Means run {run}: {} iterations, inertia {inertia:.6}, converged {}",
            result.n_iter,
            result.converged
        );
        let improved = best
            .as_ref()
            .is_none_or(|(best_inertia, _)| inertia < *best_inertia);
        if improved {
            best = Some((inertia, result));
        }
    }

    // Safe: n_init >= 1 was validated above
    let (_, result) = best.ok_or_else(|| Error::invalid_parameter("n_init", "no runs"))?;
    Ok(result)
}

fn kmeans_single<R: Rng + ?Sized>(
    shape: GridShape,
    features: &FeatureTable,
    options: &KMeansOptions,
    rng: &mut R,
) -> Result<(f64, Clustering)> {
    let n = features.nrows();

    let seeds: Vec<usize> = (0..options.n_clusters)
        .map(|_| rng.random_range(0..n))
        .collect();
    let mut centroids = features.select(Axis(0), &seeds);

    let mut assignments = Array1::zeros(n);
    let mut converged = false;
    let mut n_iter = 0;

    while n_iter < options.max_iter {
        n_iter += 1;

        assignments = assign_nearest(features, &centroids);
        let updated = update_centroids(features, &assignments, options.n_clusters, rng);

        if updated == centroids {
            converged = true;
            break;
        }
        centroids = updated;
    }

    if !converged {
        tracing::warn!("K-Means stopped after {n_iter} iterations without converging");
        assignments = assign_nearest(features, &centroids);
    }

    let inertia = inertia(features, &assignments, &centroids);
    let (assignments, centroids) = compact(assignments, centroids);

    Ok((
        inertia,
        Clustering {
            labels: shape.to_grid(assignments.to_vec())?,
            centers: centroids,
            n_iter,
            converged,
        },
    ))
}

/// Recompute each centroid as the mean of its assigned rows.
///
/// A centroid with no assigned rows is re-seeded from a random row.
#[allow(clippy::cast_precision_loss)]
fn update_centroids<R: Rng + ?Sized>(
    features: &FeatureTable,
    assignments: &Array1<usize>,
    k: usize,
    rng: &mut R,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, features.ncols()));
    let mut counts = vec![0usize; k];

    for (row, &label) in features.axis_iter(Axis(0)).zip(assignments) {
        let mut acc = sums.row_mut(label);
        acc += &row;
        counts[label] += 1;
    }

    for (idx, mut centroid) in sums.axis_iter_mut(Axis(0)).enumerate() {
        if counts[idx] == 0 {
            let pick = rng.random_range(0..features.nrows());
            tracing::debug!("Centroid {idx} lost all pixels; re-seeding from pixel {pick}");
            centroid.assign(&features.row(pick));
        } else {
            centroid /= counts[idx] as f64;
        }
    }

    sums
}

fn inertia(features: &FeatureTable, assignments: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    features
        .axis_iter(Axis(0))
        .zip(assignments)
        .map(|(row, &label)| euclidean(row, centroids.row(label)).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::build_features;
    use crate::image::ImageArray;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_blob_table() -> (GridShape, FeatureTable) {
        #[rustfmt::skip]
        let features = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.0],
            [1.0, 1.0],
            [0.9, 1.0],
            [1.0, 0.9],
        ];
        (GridShape::new(2, 3), features)
    }

    fn half_split_image() -> ImageArray {
        // Left two columns red, right two columns blue.
        ImageArray::from_shape_fn((4, 4, 3), |(_, col, ch)| match (col < 2, ch) {
            (true, 0) | (false, 2) => 255.0,
            _ => 0.0,
        })
    }

    fn top_left_quadrant_image() -> ImageArray {
        // Top-left 2x2 block red, the other twelve pixels blue.
        ImageArray::from_shape_fn((4, 4, 3), |(row, col, ch)| {
            match (row < 2 && col < 2, ch) {
                (true, 0) | (false, 2) => 255.0,
                _ => 0.0,
            }
        })
    }

    #[test]
    fn test_kmeans_single_cluster_is_mean() {
        let (shape, features) = two_blob_table();
        let mut rng = StdRng::seed_from_u64(7);

        let result = kmeans(shape, &features, &KMeansOptions::new(1), &mut rng).unwrap();

        assert!(result.converged);
        assert!(result.labels.iter().all(|&l| l == 0));
        let mean = features.mean_axis(Axis(0)).unwrap();
        for (c, m) in result.centers.row(0).iter().zip(mean.iter()) {
            assert!((c - m).abs() < 1e-12);
        }
    }

    #[test]
    fn test_kmeans_labels_cover_all_clusters() {
        let (shape, features) = two_blob_table();
        let mut rng = StdRng::seed_from_u64(3);

        let result = kmeans(shape, &features, &KMeansOptions::new(2), &mut rng).unwrap();

        let n = result.n_clusters();
        assert!(n >= 1 && n <= 2);
        for label in 0..n {
            assert!(result.labels.iter().any(|&l| l == label));
        }
        assert!(result.labels.iter().all(|&l| l < n));
    }

    #[test]
    fn test_kmeans_fixed_point_is_idempotent() {
        let (shape, features) = two_blob_table();
        let mut rng = StdRng::seed_from_u64(11);

        let result = kmeans(shape, &features, &KMeansOptions::new(2), &mut rng).unwrap();
        assert!(result.converged);

        let assignments = assign_nearest(&features, &result.centers);
        let updated = update_centroids(&features, &assignments, result.n_clusters(), &mut rng);

        assert_eq!(updated, result.centers);
        assert_eq!(shape.to_grid(assignments.to_vec()).unwrap(), result.labels);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let image = half_split_image();
        let features = build_features(&image).unwrap();
        let shape = GridShape::of(&image);
        let options = KMeansOptions::new(3);

        let a = kmeans(shape, &features, &options, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = kmeans(shape, &features, &options, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_kmeans_single_run_separates_quadrant() {
        let image = top_left_quadrant_image();
        let features = build_features(&image).unwrap();
        let shape = GridShape::of(&image);
        let options = KMeansOptions::new(2);
        assert_eq!(options.n_init, 1);

        for seed in 0..20 {
            let result =
                kmeans(shape, &features, &options, &mut StdRng::seed_from_u64(seed)).unwrap();

            assert_eq!(result.n_clusters(), 2, "seed {seed}");
            let corner = result.labels[[0, 0]];
            for ((row, col), &label) in result.labels.indexed_iter() {
                assert_eq!(label == corner, row < 2 && col < 2, "seed {seed}");
            }
        }
    }

    #[test]
    fn test_kmeans_restarts_separate_color_halves() {
        let image = half_split_image();
        let features = build_features(&image).unwrap();
        let shape = GridShape::of(&image);
        let options = KMeansOptions {
            n_init: 16,
            ..KMeansOptions::new(2)
        };

        let result = kmeans(shape, &features, &options, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(result.n_clusters(), 2);
        let left = result.labels[[0, 0]];
        for ((_, col), &label) in result.labels.indexed_iter() {
            assert_eq!(label == left, col < 2);
        }
    }

    #[test]
    fn test_kmeans_duplicate_pixels_compacts() {
        // Every pixel identical: both centroids coincide and one stays empty.
        let features = FeatureTable::from_elem((4, 5), 0.5);
        let shape = GridShape::new(2, 2);
        let mut rng = StdRng::seed_from_u64(1);

        let result = kmeans(shape, &features, &KMeansOptions::new(2), &mut rng).unwrap();

        assert_eq!(result.n_clusters(), 1);
        assert!(result.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_kmeans_iteration_cap() {
        let image = half_split_image();
        let features = build_features(&image).unwrap();
        let options = KMeansOptions {
            max_iter: 1,
            ..KMeansOptions::new(4)
        };

        let result = kmeans(
            GridShape::of(&image),
            &features,
            &options,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();

        assert_eq!(result.n_iter, 1);
        assert!(result.labels.iter().all(|&l| l < result.n_clusters()));
    }

    #[test]
    fn test_kmeans_invalid_k() {
        let (shape, features) = two_blob_table();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            kmeans(shape, &features, &KMeansOptions::new(0), &mut rng),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            kmeans(shape, &features, &KMeansOptions::new(7), &mut rng),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_kmeans_shape_mismatch() {
        let (_, features) = two_blob_table();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            kmeans(GridShape::new(3, 3), &features, &KMeansOptions::new(2), &mut rng),
            Err(Error::InvalidShape { .. })
        ));
    }
}
