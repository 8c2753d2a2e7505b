//! `pixelseg` CLI - Segment images by clustering pixels.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixelseg::{Config, Method, Pipeline};

/// Clustering algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// K-Means with a fixed number of clusters.
    Kmeans,
    /// Mean-shift with a feature-space bandwidth.
    MeanShift,
}

/// Segment an image by clustering pixels on position and color.
#[derive(Parser, Debug)]
#[command(name = "pixelseg")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path for the recolored segmentation.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Clustering algorithm.
    #[arg(short, long, value_enum, default_value_t = Algorithm::Kmeans)]
    method: Algorithm,

    /// Number of clusters for K-Means.
    #[arg(short = 'k', long, default_value = "3", value_name = "INT")]
    clusters: usize,

    /// Mean-shift bandwidth in normalized feature space.
    #[arg(short, long, default_value = "0.2", value_name = "FLOAT")]
    bandwidth: f64,

    /// Iteration cap for each convergence loop.
    #[arg(long, default_value = "300", value_name = "INT")]
    max_iter: usize,

    /// Number of K-Means restarts; the lowest-inertia run is kept.
    #[arg(long, default_value = "1", value_name = "INT")]
    n_init: usize,

    /// Fail if a loop hits the iteration cap instead of using the best-effort result.
    #[arg(long)]
    strict: bool,

    /// Random seed for reproducibility.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Also write the raw labels as a 16-bit grayscale PNG.
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pixelseg={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let method = match args.method {
        Algorithm::Kmeans => Method::KMeans {
            clusters: args.clusters,
        },
        Algorithm::MeanShift => Method::MeanShift {
            bandwidth: args.bandwidth,
        },
    };

    let config = Config {
        method,
        max_iter: args.max_iter,
        n_init: args.n_init,
        strict: args.strict,
        seed: args.seed,
        progress: true,
        output_quality: args.quality,
    };

    let mut pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    let segmentation = pipeline
        .process(&args.input, &args.output, args.labels.as_deref())
        .context("Failed to segment image")?;

    println!(
        "Segmented {} into {} clusters -> {}",
        args.input.display(),
        segmentation.clustering.n_clusters(),
        args.output.display()
    );

    Ok(())
}
