#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// calibrated camera model.
pub mod camera;

/// Error types for the camera module.
pub mod error;

pub use crate::camera::{CameraModel, RawMatrix};
pub use crate::error::CameraError;
