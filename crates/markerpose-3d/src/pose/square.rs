use markerpose_imgproc::calibration::{
    distortion::{undistort_normalized_polynomial, PolynomialDistortion},
    CameraIntrinsic,
};

use super::homography::homography_4pt2d;
use super::refine::{refine_pose_lm, LMParams};
use crate::error::PoseError;
use crate::linalg;
use crate::so3::rotation_vector_from_matrix;

/// Pose of a square marker in the camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPose {
    /// Rodrigues axis-angle representation of the rotation.
    pub rvec: [f64; 3],
    /// Translation of the marker center, in the unit of the marker length.
    pub tvec: [f64; 3],
    /// Root-mean-square reprojection error in pixels.
    pub reproj_rmse: f64,
}

/// The 3d corners of a square marker of side `length` centred at the origin of the z=0 plane.
///
/// The order follows the detected corner order (clockwise in the image, starting top-left):
///  - p0 = [-L/2,  L/2, 0]
///  - p1 = [ L/2,  L/2, 0]
///  - p2 = [ L/2, -L/2, 0]
///  - p3 = [-L/2, -L/2, 0]
pub fn square_object_points(length: f64) -> [[f64; 3]; 4] {
    let h = length / 2.0;
    [[-h, h, 0.0], [h, h, 0.0], [h, -h, 0.0], [-h, -h, 0.0]]
}

/// Estimate the pose of a square marker from its four image corners.
///
/// The corners are undistorted with the pinhole model, a plane homography
/// provides the initial pose which is then refined by minimizing the
/// reprojection error.
///
/// # Arguments
///
/// * `corners` - The four marker corners in pixels, in object point order.
/// * `length` - The marker side length.
/// * `intrinsic` - The camera intrinsics.
/// * `distortion` - The pinhole distortion of the corners.
pub fn solve_square_marker(
    corners: &[[f64; 2]; 4],
    length: f64,
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> Result<MarkerPose, PoseError> {
    let mut normalized = [[0.0; 2]; 4];
    for (dst, c) in normalized.iter_mut().zip(corners.iter()) {
        let (xd, yd) = intrinsic.normalize(c[0], c[1]);
        let (x, y) = if distortion.is_zero() {
            (xd, yd)
        } else {
            undistort_normalized_polynomial(xd, yd, distortion)
        };
        *dst = [x, y];
    }

    let object = square_object_points(length);
    let object_2d = object.map(|p| [p[0], p[1]]);

    let h = homography_4pt2d(&object_2d, &normalized)?;
    let (rotation, translation) = decompose_homography(&h)?;

    let mut rvec = rotation_vector_from_matrix(&rotation);
    let mut tvec = translation;

    let ideal = normalized.map(|p| {
        let (u, v) = intrinsic.denormalize(p[0], p[1]);
        [u, v]
    });
    let (reproj_rmse, _, _) = refine_pose_lm(
        &object,
        &ideal,
        intrinsic,
        &mut rvec,
        &mut tvec,
        &LMParams::default(),
    )?;
    log::trace!("square marker pose refined, rmse {reproj_rmse:.4} px");

    if tvec[2] <= 0.0 {
        return Err(PoseError::BehindCamera(tvec[2]));
    }

    Ok(MarkerPose {
        rvec,
        tvec,
        reproj_rmse,
    })
}

/// Decompose a homography from the marker plane to normalized image coordinates into a pose.
fn decompose_homography(h: &[[f64; 3]; 3]) -> Result<([[f64; 3]; 3], [f64; 3]), PoseError> {
    let h1 = [h[0][0], h[1][0], h[2][0]];
    let h2 = [h[0][1], h[1][1], h[2][1]];
    let h3 = [h[0][2], h[1][2], h[2][2]];

    let n1 = linalg::norm_vec3(&h1);
    let n2 = linalg::norm_vec3(&h2);
    if n1 < 1e-12 || n2 < 1e-12 {
        return Err(PoseError::DegenerateHomography("zero column"));
    }

    // scale so that ||r1|| ≈ ||r2|| ≈ 1, keeping the marker in front of the camera
    let mut s = 1.0 / (n1 * n2).sqrt();
    if h3[2] * s < 0.0 {
        s = -s;
    }

    let r1 = h1.map(|v| v * s);
    let r2 = h2.map(|v| v * s);
    let r3 = linalg::cross_vec3(&r1, &r2);

    let approx = [
        [r1[0], r2[0], r3[0]],
        [r1[1], r2[1], r3[1]],
        [r1[2], r2[2], r3[2]],
    ];
    let rotation = linalg::project_to_so3(&approx);
    let translation = h3.map(|v| v * s);

    if rotation.iter().flatten().chain(translation.iter()).any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite);
    }

    Ok((rotation, translation))
}
