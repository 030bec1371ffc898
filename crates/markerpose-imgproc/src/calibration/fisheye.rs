use std::f64::consts::FRAC_PI_2;

use super::CameraIntrinsic;
use crate::interpolation::grid::meshgrid_from_fn;
use markerpose_image::{Image, ImageError, ImageSize};

/// Represents the equidistant fisheye distortion parameters of a camera
///
/// The distorted angle is `theta_d = theta * (1 + k1 θ² + k2 θ⁴ + k3 θ⁶ + k4 θ⁸)`
/// where `theta` is the angle of incidence of the ray.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FisheyeDistortion {
    /// The first coefficient
    pub k1: f64,
    /// The second coefficient
    pub k2: f64,
    /// The third coefficient
    pub k3: f64,
    /// The fourth coefficient
    pub k4: f64,
}

impl FisheyeDistortion {
    /// Build the model from a `[k1, k2, k3, k4]` coefficient vector.
    pub fn from_coefficients(c: [f64; 4]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            k3: c[2],
            k4: c[3],
        }
    }

    fn theta_d(&self, theta: f64) -> f64 {
        let t2 = theta * theta;
        let t4 = t2 * t2;
        let t6 = t4 * t2;
        let t8 = t4 * t4;
        theta * (1.0 + self.k1 * t2 + self.k2 * t4 + self.k3 * t6 + self.k4 * t8)
    }
}

/// Distort a point given in normalized image coordinates.
pub fn distort_normalized_fisheye(x: f64, y: f64, distortion: &FisheyeDistortion) -> (f64, f64) {
    let r = (x * x + y * y).sqrt();
    if r < 1e-8 {
        return (x, y);
    }
    let theta_d = distortion.theta_d(r.atan());
    let scale = theta_d / r;
    (x * scale, y * scale)
}

/// Remove fisheye distortion from a normalized point.
///
/// Solves `theta_d(theta) = |p|` with Newton's method. Returns `None` when the
/// solver does not converge or the solution flips sign.
pub fn undistort_normalized_fisheye(
    xd: f64,
    yd: f64,
    distortion: &FisheyeDistortion,
) -> Option<(f64, f64)> {
    let (k1, k2, k3, k4) = (distortion.k1, distortion.k2, distortion.k3, distortion.k4);
    let theta_d = (xd * xd + yd * yd).sqrt().clamp(-FRAC_PI_2, FRAC_PI_2);

    if theta_d <= 1e-8 {
        return Some((xd, yd));
    }

    let mut theta = theta_d;
    let mut converged = false;
    for _ in 0..10 {
        let t2 = theta * theta;
        let t4 = t2 * t2;
        let t6 = t4 * t2;
        let t8 = t6 * t2;
        let fix = (theta * (1.0 + k1 * t2 + k2 * t4 + k3 * t6 + k4 * t8) - theta_d)
            / (1.0 + 3.0 * k1 * t2 + 5.0 * k2 * t4 + 7.0 * k3 * t6 + 9.0 * k4 * t8);
        theta -= fix;
        if fix.abs() < 1e-10 {
            converged = true;
            break;
        }
    }

    if !converged || theta < 0.0 {
        return None;
    }

    let scale = theta.tan() / theta_d;
    Some((xd * scale, yd * scale))
}

/// Estimate the camera matrix of the rectified image.
///
/// The image edge midpoints are undistorted and the focal length is chosen
/// between the value that keeps all source pixels (`balance = 1`) and the
/// value that leaves no invalid pixels (`balance = 0`).
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the distorted camera
/// * `distortion` - The fisheye distortion parameters
/// * `size` - The size of the image
/// * `balance` - Blend between the minimal and maximal focal length, in [0, 1]
pub fn estimate_new_camera_matrix_fisheye(
    intrinsic: &CameraIntrinsic,
    distortion: &FisheyeDistortion,
    size: &ImageSize,
    balance: f64,
) -> CameraIntrinsic {
    let balance = balance.clamp(0.0, 1.0);
    let (w, h) = (size.width as f64, size.height as f64);

    let edges = [(w / 2.0, 0.0), (w, h / 2.0), (w / 2.0, h), (0.0, h / 2.0)];

    let aspect = intrinsic.fx / intrinsic.fy;
    let points = edges
        .iter()
        .map(|&(u, v)| {
            let (xd, yd) = intrinsic.normalize(u, v);
            let (x, y) = undistort_normalized_fisheye(xd, yd, distortion).unwrap_or((xd, yd));
            (x, y * aspect)
        })
        .collect::<Vec<_>>();

    let cn_x = points.iter().map(|p| p.0).sum::<f64>() / 4.0;
    let cn_y = points.iter().map(|p| p.1).sum::<f64>() / 4.0;

    let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let f1 = w * 0.5 / (cn_x - min_x);
    let f2 = w * 0.5 / (max_x - cn_x);
    let f3 = h * 0.5 * aspect / (cn_y - min_y);
    let f4 = h * 0.5 * aspect / (max_y - cn_y);

    let fmin = f1.min(f2).min(f3).min(f4);
    let fmax = f1.max(f2).max(f3).max(f4);

    let f = balance * fmin + (1.0 - balance) * fmax;

    let new_cx = -cn_x * f + w * 0.5;
    let new_cy = -cn_y * f + h * aspect * 0.5;

    CameraIntrinsic {
        fx: f,
        fy: f / aspect,
        cx: new_cx,
        cy: new_cy / aspect,
    }
}

/// Generate the undistort and rectify map for a fisheye camera with identity rectification.
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the distorted camera
/// * `new_intrinsic` - The intrinsic parameters of the rectified camera
/// * `distortion` - The fisheye distortion parameters
/// * `size` - The size of the image
///
/// # Returns
///
/// * `map_x` - The x map for undistorting and rectifying the image
/// * `map_y` - The y map for undistorting and rectifying the image
pub fn generate_correction_map_fisheye(
    intrinsic: &CameraIntrinsic,
    new_intrinsic: &CameraIntrinsic,
    distortion: &FisheyeDistortion,
    size: &ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    meshgrid_from_fn(size.width, size.height, |u, v| {
        let (x, y) = new_intrinsic.normalize(u as f64, v as f64);
        let (xd, yd) = distort_normalized_fisheye(x, y, distortion);
        let (us, vs) = intrinsic.denormalize(xd, yd);
        (us as f32, vs as f32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> (CameraIntrinsic, FisheyeDistortion) {
        (
            CameraIntrinsic {
                fx: 310.0,
                fy: 305.0,
                cx: 322.0,
                cy: 238.0,
            },
            FisheyeDistortion {
                k1: -0.012,
                k2: 0.043,
                k3: -0.031,
                k4: 0.006,
            },
        )
    }

    #[test]
    fn undistort_inverts_distort() {
        let (_, distortion) = camera();
        for &(x, y) in &[(0.0, 0.0), (0.3, -0.2), (-1.1, 0.7), (0.05, 0.9)] {
            let (xd, yd) = distort_normalized_fisheye(x, y, &distortion);
            let (xu, yu) = undistort_normalized_fisheye(xd, yd, &distortion).unwrap();
            assert_relative_eq!(xu, x, epsilon = 1e-8);
            assert_relative_eq!(yu, y, epsilon = 1e-8);
        }
    }

    #[test]
    fn symmetric_camera_keeps_center() {
        let intrinsic = CameraIntrinsic {
            fx: 300.0,
            fy: 300.0,
            cx: 320.0,
            cy: 240.0,
        };
        let size = ImageSize {
            width: 640,
            height: 480,
        };
        let new =
            estimate_new_camera_matrix_fisheye(&intrinsic, &FisheyeDistortion::default(), &size, 1.0);
        // the equidistant projection compresses the edges, so keeping the
        // whole field of view needs a shorter focal length
        assert!(new.fx < 300.0);
        assert_relative_eq!(new.fx, new.fy, epsilon = 1e-9);
        assert_relative_eq!(new.cx, 320.0, epsilon = 1e-9);
        assert_relative_eq!(new.cy, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn balance_widens_field_of_view() {
        let (intrinsic, _) = camera();
        let distortion = FisheyeDistortion {
            k1: -0.05,
            ..Default::default()
        };
        let size = ImageSize {
            width: 640,
            height: 480,
        };
        let full = estimate_new_camera_matrix_fisheye(&intrinsic, &distortion, &size, 1.0);
        let crop = estimate_new_camera_matrix_fisheye(&intrinsic, &distortion, &size, 0.0);
        assert!(full.fx <= crop.fx);
    }

    #[test]
    fn correction_map_shape_and_center() -> Result<(), ImageError> {
        let (intrinsic, distortion) = camera();
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        let new = CameraIntrinsic {
            cx: 32.0,
            cy: 24.0,
            ..intrinsic
        };
        let (map_x, map_y) =
            generate_correction_map_fisheye(&intrinsic, &new, &distortion, &size)?;
        assert_eq!(map_x.size(), size);
        assert_eq!(map_y.size(), size);

        // the principal point maps onto the source principal point
        let center_x = map_x.get_pixel(32, 24, 0)?;
        let center_y = map_y.get_pixel(32, 24, 0)?;
        assert_relative_eq!(center_x as f64, intrinsic.cx, epsilon = 1e-3);
        assert_relative_eq!(center_y as f64, intrinsic.cy, epsilon = 1e-3);

        Ok(())
    }
}
