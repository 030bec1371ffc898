use glam::DVec3;
use markerpose_imgproc::calibration::{
    distortion::{distort_normalized_polynomial, PolynomialDistortion},
    CameraIntrinsic,
};

use crate::so3::SO3;

/// Move 3d points from an object frame to the camera frame.
pub fn transform_points(points: &[[f64; 3]], rvec: &[f64; 3], tvec: &[f64; 3]) -> Vec<[f64; 3]> {
    let rot = SO3::exp(DVec3::from_array(*rvec));
    let t = DVec3::from_array(*tvec);

    points
        .iter()
        .map(|p| (rot.rotate(DVec3::from_array(*p)) + t).to_array())
        .collect()
}

/// Project 3d points given in an object frame onto the image plane.
///
/// Points are not checked against the camera plane: a point behind the
/// camera is projected to a mirrored position. Use [`transform_points`] to
/// check the depths first.
///
/// # Arguments
///
/// * `points` - The 3d points in the object frame.
/// * `rvec` - The rotation vector from the object to the camera frame.
/// * `tvec` - The translation from the object to the camera frame.
/// * `intrinsic` - The camera intrinsics.
/// * `distortion` - The pinhole distortion applied after the perspective division.
///
/// # Returns
///
/// The pixel coordinates of each point.
pub fn project_points(
    points: &[[f64; 3]],
    rvec: &[f64; 3],
    tvec: &[f64; 3],
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> Vec<[f64; 2]> {
    transform_points(points, rvec, tvec)
        .iter()
        .map(|pc| {
            let (x, y) = (pc[0] / pc[2], pc[1] / pc[2]);
            let (xd, yd) = distort_normalized_polynomial(x, y, distortion);
            let (u, v) = intrinsic.denormalize(xd, yd);
            [u, v]
        })
        .collect()
}
