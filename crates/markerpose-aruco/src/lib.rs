#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// drawing of detections on images.
pub mod annotate;

/// quadrilateral candidate search.
pub mod candidates;

/// marker bit extraction and identification.
pub mod decode;

/// the marker detector.
pub mod detector;

/// predefined marker dictionaries.
pub mod dictionary;

/// Error types for the aruco module.
pub mod error;

/// detector parameters.
pub mod params;

/// sub-pixel corner refinement.
pub mod refine;

pub use crate::candidates::Quad;
pub use crate::decode::DecodedMarker;
pub use crate::detector::{Detection, DetectionReport, MarkerDetections, MarkerDetector};
pub use crate::dictionary::{Dictionary, PredefinedDictionary};
pub use crate::error::ArucoError;
pub use crate::params::{CornerRefinementMethod, DetectorParameters, DetectorParametersFile};
