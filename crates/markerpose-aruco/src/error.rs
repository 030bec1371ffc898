use markerpose_camera::CameraError;
use markerpose_image::ImageError;

/// Errors that can occur when detecting markers.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArucoError {
    /// The detector configuration is invalid.
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by the camera model.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Error related to image.
    #[error(transparent)]
    Image(#[from] ImageError),
}
