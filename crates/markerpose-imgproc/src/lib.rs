#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// lens distortion models and undistortion maps.
pub mod calibration;

/// color transformations module.
pub mod color;

/// connected components and polygon approximation.
pub mod contours;

/// utilities to draw on images.
pub mod draw;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallization utilities.
pub mod parallel;

/// operations to threshold images.
pub mod threshold;
