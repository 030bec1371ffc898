//! Pixel interpolation methods for image resampling.
//!
//! Samples falling outside the image read as zero (constant border).

mod bicubic;
mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

pub(crate) mod interpolate;
mod remap;

pub use interpolate::{interpolate_pixel, InterpolationMode};
pub use remap::remap;
