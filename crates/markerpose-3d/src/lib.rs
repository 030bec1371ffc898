#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// surface normals from rotation vectors and their statistics.
pub mod aggregate;

/// Error types for the pose module.
pub mod error;

/// small dense linear algebra helpers.
pub mod linalg;

/// pose estimation module.
pub mod pose;

/// projection of 3d points onto the image plane.
pub mod projection;

/// rotation group utilities.
pub mod so3;

pub use crate::aggregate::{
    aggregate, normal_from_rotation, twist_tilt_decompose, AggregateError, NormalEstimate,
    TwistTilt, REFERENCE_NORMAL, TARGET_NORMAL,
};
pub use crate::error::PoseError;
pub use crate::so3::SO3;
