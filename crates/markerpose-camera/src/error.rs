use markerpose_image::{ImageError, ImageSize};

/// An error type for the camera module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CameraError {
    /// The calibration data is malformed.
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    /// The image does not have the calibrated size.
    #[error("Image size {actual} does not match the calibrated size {expected}")]
    SizeMismatch {
        /// The calibrated image size.
        expected: ImageSize,
        /// The size of the offending image.
        actual: ImageSize,
    },

    /// Undistortion of images is only available for fisheye models.
    #[error("Image undistortion is not supported for pinhole models")]
    UnsupportedUndistortion,

    /// Error from the image container or processing.
    #[error(transparent)]
    Image(#[from] ImageError),
}
