use super::CameraIntrinsic;

/// Represents the polynomial distortion parameters of a camera, in the
/// four coefficient `(k1, k2, p1, p2)` layout.
///
/// # Fields
///
/// * `k1` - The first radial distortion coefficient
/// * `k2` - The second radial distortion coefficient
/// * `p1` - The first tangential distortion coefficient
/// * `p2` - The second tangential distortion coefficient
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolynomialDistortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Build the model from a `[k1, k2, p1, p2]` coefficient vector.
    pub fn from_coefficients(c: [f64; 4]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
        }
    }

    /// Whether all coefficients are zero.
    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.p1 == 0.0 && self.p2 == 0.0
    }
}

/// Distort a point given in normalized image coordinates.
pub fn distort_normalized_polynomial(
    x: f64,
    y: f64,
    distortion: &PolynomialDistortion,
) -> (f64, f64) {
    let (k1, k2, p1, p2) = (distortion.k1, distortion.k2, distortion.p1, distortion.p2);

    let r2 = x * x + y * y;
    let kr = 1.0 + k1 * r2 + k2 * r2 * r2;

    let xd = x * kr + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
    let yd = y * kr + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

    (xd, yd)
}

/// Distort a point using polynomial distortion
///
/// # Arguments
///
/// * `x` - The x coordinate of the point
/// * `y` - The y coordinate of the point
/// * `intrinsic` - The intrinsic parameters of the camera
/// * `distortion` - The distortion parameters of the camera
///
/// # Returns
///
/// The distorted pixel coordinates.
pub fn distort_point_polynomial(
    x: f64,
    y: f64,
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> (f64, f64) {
    let (x, y) = intrinsic.normalize(x, y);
    let (xd, yd) = distort_normalized_polynomial(x, y, distortion);
    intrinsic.denormalize(xd, yd)
}

/// Remove polynomial distortion from a normalized point by fixed-point iteration.
pub fn undistort_normalized_polynomial(
    xd: f64,
    yd: f64,
    distortion: &PolynomialDistortion,
) -> (f64, f64) {
    let (k1, k2, p1, p2) = (distortion.k1, distortion.k2, distortion.p1, distortion.p2);
    let (mut x, mut y) = (xd, yd);

    for _ in 0..20 {
        let r2 = x * x + y * y;
        let kr = 1.0 + k1 * r2 + k2 * r2 * r2;
        let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        x = (xd - dx) / kr;
        y = (yd - dy) / kr;
    }

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distort_identity_without_coefficients() {
        let intrinsic = CameraIntrinsic {
            fx: 500.0,
            fy: 500.0,
            cx: 320.0,
            cy: 240.0,
        };
        let (x, y) =
            distort_point_polynomial(100.0, 20.0, &intrinsic, &PolynomialDistortion::default());
        assert_relative_eq!(x, 100.0);
        assert_relative_eq!(y, 20.0);
    }

    #[test]
    fn undistort_inverts_distort() {
        let distortion = PolynomialDistortion {
            k1: -0.28,
            k2: 0.07,
            p1: 0.001,
            p2: -0.0005,
        };
        let (x, y) = (0.21, -0.13);
        let (xd, yd) = distort_normalized_polynomial(x, y, &distortion);
        let (xu, yu) = undistort_normalized_polynomial(xd, yd, &distortion);
        assert_relative_eq!(xu, x, epsilon = 1e-9);
        assert_relative_eq!(yu, y, epsilon = 1e-9);
    }
}
