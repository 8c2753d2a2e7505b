//! Main pipeline for pixel segmentation.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cluster::{kmeans, mean_shift, Clustering, KMeansOptions, MeanShiftOptions};
use crate::error::{Error, Result};
use crate::features::build_features;
use crate::grid::GridShape;
use crate::image::{self, ImageArray};
use crate::render::render_clusters;

/// Clustering algorithm and its parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    /// K-Means with a fixed number of clusters.
    KMeans { clusters: usize },
    /// Mean-shift with the given feature-space bandwidth.
    MeanShift { bandwidth: f64 },
}

impl Method {
    const fn stage(&self) -> &'static str {
        match self {
            Self::KMeans { .. } => "K-Means",
            Self::MeanShift { .. } => "mean-shift",
        }
    }
}

/// Configuration for the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Clustering algorithm.
    pub method: Method,

    /// Iteration cap for every convergence loop.
    pub max_iter: usize,

    /// Number of K-Means restarts; ignored by mean-shift.
    pub n_init: usize,

    /// Fail instead of returning a best-effort result when a loop hits `max_iter`.
    pub strict: bool,

    /// Random seed for reproducibility. None for random.
    pub seed: Option<u64>,

    /// Show a progress bar during mean-shift discovery.
    pub progress: bool,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: Method::KMeans { clusters: 3 },
            max_iter: 300,
            n_init: 1,
            strict: false,
            seed: None,
            progress: false,
            output_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        match self.method {
            Method::KMeans { clusters } if clusters == 0 => {
                return Err(Error::invalid_parameter("clusters", "must be greater than 0"));
            }
            Method::MeanShift { bandwidth } if !bandwidth.is_finite() || bandwidth <= 0.0 => {
                return Err(Error::invalid_parameter(
                    "bandwidth",
                    "must be finite and greater than 0",
                ));
            }
            _ => {}
        }

        if self.max_iter == 0 {
            return Err(Error::invalid_parameter("max_iter", "must be greater than 0"));
        }

        if self.n_init == 0 {
            return Err(Error::invalid_parameter("n_init", "must be greater than 0"));
        }

        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::invalid_parameter(
                "output_quality",
                "must be between 1 and 100",
            ));
        }

        Ok(())
    }
}

/// Output of one segmentation run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Labels and cluster centers.
    pub clustering: Clustering,
    /// Image with each pixel replaced by its cluster's average color.
    pub rendered: ImageArray,
}

/// Pixel segmentation pipeline.
///
/// Owns the random source, so runs from a fresh pipeline with the same seed
/// are reproducible.
pub struct Pipeline {
    config: Config,
    rng: StdRng,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");

        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Ok(Self { config, rng })
    }

    /// Segment an in-memory `(H, W, 3)` image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is malformed, the parameters do not fit
    /// the image, or a loop fails to converge in strict mode.
    pub fn segment(&mut self, image: &ImageArray) -> Result<Segmentation> {
        let shape = GridShape::of(image);

        tracing::info!(
            "Building features for {}x{} image",
            shape.width,
            shape.height
        );
        let features = build_features(image)?;

        tracing::info!("Clustering with {}...", self.config.method.stage());
        let clustering = match self.config.method {
            Method::KMeans { clusters } => {
                let options = KMeansOptions {
                    n_clusters: clusters,
                    max_iter: self.config.max_iter,
                    n_init: self.config.n_init,
                };
                kmeans(shape, &features, &options, &mut self.rng)?
            }
            Method::MeanShift { bandwidth } => {
                let options = MeanShiftOptions {
                    bandwidth,
                    max_iter: self.config.max_iter,
                };
                let pb = self.progress_bar();
                mean_shift(shape, &features, &options, &mut self.rng, &pb)?
            }
        };

        if !clustering.converged {
            if self.config.strict {
                return Err(Error::NonConvergence {
                    stage: self.config.method.stage(),
                    iterations: self.config.max_iter,
                });
            }
            tracing::warn!(
                "{} hit the iteration cap; using best-effort result",
                self.config.method.stage()
            );
        }

        tracing::info!(
            "Found {} clusters in {} iterations",
            clustering.n_clusters(),
            clustering.n_iter
        );

        tracing::info!("Rendering cluster colors...");
        let rendered = render_clusters(image, &clustering.labels)?;

        Ok(Segmentation {
            clustering,
            rendered,
        })
    }

    /// Segment an image file.
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input image
    /// * `output_path` - Path to save the recolored image
    /// * `labels_path` - Optional path for a 16-bit PNG of raw labels
    ///
    /// # Errors
    ///
    /// Returns an error if loading, segmentation or saving fails.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input_path: P,
        output_path: Q,
        labels_path: Option<&Path>,
    ) -> Result<Segmentation> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        tracing::info!("Processing image: {}", input_path.display());
        let image_array = image::load_image(input_path)?;

        let segmentation = self.segment(&image_array)?;

        tracing::info!("Saving output to: {}", output_path.display());
        image::save_image(
            &segmentation.rendered,
            output_path,
            self.config.output_quality,
        )?;

        if let Some(path) = labels_path {
            tracing::info!("Saving labels to: {}", path.display());
            image::save_labels(&segmentation.clustering.labels, path)?;
        }

        tracing::info!("Processing complete");
        Ok(segmentation)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Mean-shift [{bar:40.cyan/blue}] {pos}/{len} pixels")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb
    }
}
