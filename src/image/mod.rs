//! Image loading and saving utilities.

mod load;
mod save;

pub use load::{image_to_array, load_image};
pub use save::{array_to_image, save_image, save_labels};

use ndarray::Array3;

/// Image array in HWC format (height, width, channels).
/// Values keep the source range, 0..=255 for 8-bit images.
pub type ImageArray = Array3<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
