//! # `pixelseg`
//!
//! Unsupervised image segmentation by clustering pixels in a joint
//! spatial-color feature space.
//!
//! Each pixel becomes a normalized `[row, col, r, g, b]` feature vector.
//! Pixels are then grouped either by K-means with a fixed cluster count or
//! by mean-shift with a bandwidth, and the resulting label grid is rendered
//! by painting every pixel with its cluster's average color.
//!
//! ## Example
//!
//! ```no_run
//! use pixelseg::{Config, Method, Pipeline};
//!
//! # fn main() -> pixelseg::Result<()> {
//! let config = Config {
//!     method: Method::MeanShift { bandwidth: 0.2 },
//!     seed: Some(42),
//!     ..Config::default()
//! };
//! let mut pipeline = Pipeline::new(config)?;
//!
//! pipeline.process("photo.png", "segmented.png", None)?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod error;
pub mod features;
pub mod grid;
pub mod image;
pub mod pipeline;
pub mod render;

pub use cluster::{Clustering, LabelGrid};
pub use error::{Error, Result};
pub use pipeline::{Config, Method, Pipeline, Segmentation};
