//! Mean-shift clustering of pixel feature vectors.
//!
//! Discovery repeatedly seeds a trajectory at a random unvisited pixel and
//! shifts it to the mean of all rows within `bandwidth` of the previous
//! mean. Every row swept into a trajectory's window is marked visited.
//! A converged mean within half a bandwidth of an existing mode is merged
//! into it; otherwise it becomes a new mode. Pixels are finally labeled
//! with their nearest mode.

use indicatif::ProgressBar;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use crate::error::{Error, Result};
use crate::features::{check_table, FeatureTable};
use crate::grid::GridShape;

use super::{assign_nearest, compact, euclidean, Clustering};

/// A trajectory has converged once a step moves the mean less than this
/// fraction of the bandwidth.
const CONVERGENCE_RATIO: f64 = 0.01;

/// Converged means closer than this fraction of the bandwidth to an
/// existing mode are merged into it.
const MERGE_RATIO: f64 = 0.5;

/// Options for mean-shift clustering.
#[derive(Debug, Clone)]
pub struct MeanShiftOptions {
    /// Window radius in feature space.
    pub bandwidth: f64,
    /// Maximum shift steps per trajectory.
    pub max_iter: usize,
}

impl Default for MeanShiftOptions {
    fn default() -> Self {
        Self {
            bandwidth: 0.2,
            max_iter: 300,
        }
    }
}

impl MeanShiftOptions {
    /// Options for the given bandwidth with default limits.
    #[must_use]
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(Error::invalid_parameter(
                "bandwidth",
                format!("must be finite and greater than 0, got {}", self.bandwidth),
            ));
        }
        if self.max_iter == 0 {
            return Err(Error::invalid_parameter("max_iter", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Discover clusters by mean shifting and label every pixel with its nearest mode.
///
/// # Arguments
///
/// * `shape` - Spatial shape of the source image
/// * `features` - Feature table with one row per pixel, row-major
/// * `options` - Bandwidth and iteration limits
/// * `rng` - Random source for trajectory seeding
/// * `progress` - Advanced to the number of visited pixels
///
/// # Errors
///
/// Returns an error if the table does not match `shape` or the options are invalid.
/// Trajectories cut off at `max_iter` are reported through
/// [`Clustering::converged`].
pub fn mean_shift<R: Rng + ?Sized>(
    shape: GridShape,
    features: &FeatureTable,
    options: &MeanShiftOptions,
    rng: &mut R,
    progress: &ProgressBar,
) -> Result<Clustering> {
    check_table(shape, features)?;
    options.validate()?;

    let discovery = discover(features, options, rng, progress)?;
    progress.finish_with_message("Mean-shift complete");

    tracing::debug!(
        "Mean-shift: {} trajectories, {} shift steps, {} modes",
        discovery.trajectories,
        discovery.steps,
        discovery.modes.len()
    );
    if discovery.stalled > 0 {
        tracing::warn!(
            "{} of {} trajectories hit the {}-step cap",
            discovery.stalled,
            discovery.trajectories,
            options.max_iter
        );
    }

    let modes = discovery.mode_matrix(features.ncols())?;
    let (assignments, modes) = compact(assign_nearest(features, &modes), modes);

    Ok(Clustering {
        labels: shape.to_grid(assignments.to_vec())?,
        centers: modes,
        n_iter: discovery.steps,
        converged: discovery.stalled == 0,
    })
}

/// Mutable state of one discovery run.
#[derive(Debug)]
struct Discovery {
    visited: Vec<bool>,
    remaining: usize,
    modes: Vec<Array1<f64>>,
    trajectories: usize,
    steps: usize,
    stalled: usize,
}

struct Trajectory {
    mean: Array1<f64>,
    steps: usize,
    converged: bool,
}

impl Discovery {
    fn new(n: usize) -> Self {
        Self {
            visited: vec![false; n],
            remaining: n,
            modes: Vec::new(),
            trajectories: 0,
            steps: 0,
            stalled: 0,
        }
    }

    fn visit(&mut self, index: usize) {
        if !self.visited[index] {
            self.visited[index] = true;
            self.remaining -= 1;
        }
    }

    /// Uniformly random unvisited pixel.
    fn pick_unvisited<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let pending: Vec<usize> = self
            .visited
            .iter()
            .enumerate()
            .filter(|(_, visited)| !**visited)
            .map(|(idx, _)| idx)
            .collect();
        pending[rng.random_range(0..pending.len())]
    }

    /// Shift a mean until it settles, marking every row inside the window as visited.
    #[allow(clippy::cast_precision_loss)]
    fn shift(
        &mut self,
        features: &FeatureTable,
        start: Array1<f64>,
        options: &MeanShiftOptions,
    ) -> Result<Trajectory> {
        let bandwidth = options.bandwidth;
        let mut prev = start;

        for step in 1..=options.max_iter {
            let mut sum = Array1::<f64>::zeros(features.ncols());
            let mut count = 0usize;

            for (idx, row) in features.axis_iter(Axis(0)).enumerate() {
                if euclidean(row, prev.view()) < bandwidth {
                    self.visit(idx);
                    sum += &row;
                    count += 1;
                }
            }

            if count == 0 {
                return Err(Error::EmptyCluster {
                    cluster: self.modes.len(),
                });
            }

            let mean = sum / count as f64;
            if euclidean(mean.view(), prev.view()) < CONVERGENCE_RATIO * bandwidth {
                return Ok(Trajectory {
                    mean,
                    steps: step,
                    converged: true,
                });
            }
            prev = mean;
        }

        Ok(Trajectory {
            mean: prev,
            steps: options.max_iter,
            converged: false,
        })
    }

    /// Record a converged mean as a new mode unless an existing mode absorbs it.
    fn merge(&mut self, mean: Array1<f64>, bandwidth: f64) -> bool {
        let absorbed = self
            .modes
            .iter()
            .any(|mode| euclidean(mode.view(), mean.view()) < MERGE_RATIO * bandwidth);
        if !absorbed {
            self.modes.push(mean);
        }
        !absorbed
    }

    fn mode_matrix(&self, dim: usize) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self.modes.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.modes.len(), dim), flat).map_err(|_| Error::InvalidShape {
            expected: format!("{} modes of dimension {dim}", self.modes.len()),
            actual: "ragged mode set".to_string(),
        })
    }
}

fn discover<R: Rng + ?Sized>(
    features: &FeatureTable,
    options: &MeanShiftOptions,
    rng: &mut R,
    progress: &ProgressBar,
) -> Result<Discovery> {
    let n = features.nrows();
    let mut state = Discovery::new(n);
    progress.set_length(n as u64);

    while state.remaining > 0 {
        let seed = state.pick_unvisited(rng);
        state.visit(seed);

        let trajectory = state.shift(features, features.row(seed).to_owned(), options)?;
        state.trajectories += 1;
        state.steps += trajectory.steps;
        if !trajectory.converged {
            state.stalled += 1;
        }

        let created = state.merge(trajectory.mean, options.bandwidth);
        tracing::debug!(
            "Trajectory from pixel {seed}: {} steps, {}",
            trajectory.steps,
            if created { "new mode" } else { "merged" }
        );

        progress.set_position((n - state.remaining) as u64);
    }

    Ok(state)
}
