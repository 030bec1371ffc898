#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// camera calibration files.
pub mod calibration;

/// Frame sources and the capture session.
///
/// A [`capture::FrameSource`] yields frames on demand and a
/// [`capture::CaptureSession`] previews them and saves the selected ones.
pub mod capture;

/// Error types for I/O operations.
pub mod error;

/// High-level image reading and writing functions.
pub mod functional;

/// detector parameters files.
pub mod params;

/// CSV pose and twist tables.
pub mod table;

pub use crate::error::IoError;
