//! Segmentation pipeline: features, clustering and rendering.

mod segment;

pub use segment::{Config, Method, Pipeline, Segmentation};
