/// Errors raised while estimating the pose of a single marker.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PoseError {
    /// The corner configuration does not define a homography.
    #[error("Degenerate homography: {0}")]
    DegenerateHomography(&'static str),

    /// The estimated pose places the marker behind the camera.
    #[error("Marker is behind the camera (tz = {0})")]
    BehindCamera(f64),

    /// A corner could not be undistorted.
    #[error("Corner {0} could not be undistorted")]
    UndistortionFailed(usize),

    /// The solver produced a non finite value.
    #[error("Pose estimate is not finite")]
    NonFinite,

    /// Mismatched number of correspondences.
    #[error("Mismatched array lengths: {0} world points vs {1} image points")]
    MismatchedArrayLengths(usize, usize),
}
