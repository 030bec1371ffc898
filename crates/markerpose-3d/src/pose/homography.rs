use crate::error::PoseError;
use crate::linalg;

/// Similarity moving the centroid of the points to the origin with a mean distance of sqrt(2).
///
/// Returns the transform and its inverse, or `None` if the points coincide.
fn normalization_transform(points: &[[f64; 2]; 4]) -> Option<([[f64; 3]; 3], [[f64; 3]; 3])> {
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / 4.0;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    if !mean_dist.is_finite() || mean_dist <= f64::MIN_POSITIVE {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = [[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]];
    let t_inv = [[1.0 / s, 0.0, cx], [0.0, 1.0 / s, cy], [0.0, 0.0, 1.0]];
    Some((t, t_inv))
}

/// Compute the homography matrix from four 2d point correspondences.
///
/// Both point sets are normalized before solving, so the result and the
/// degeneracy check do not depend on the unit of the coordinates.
///
/// * `x1` - The source 2d points with shape (4, 2).
/// * `x2` - The destination 2d points with shape (4, 2).
///
/// Returns the homography from src to dst with shape (3, 3), normalized so
/// that its last element is one.
pub fn homography_4pt2d(x1: &[[f64; 2]; 4], x2: &[[f64; 2]; 4]) -> Result<[[f64; 3]; 3], PoseError> {
    let (t1, _) = normalization_transform(x1)
        .ok_or(PoseError::DegenerateHomography("source points coincide"))?;
    let (t2, t2_inv) = normalization_transform(x2)
        .ok_or(PoseError::DegenerateHomography("destination points coincide"))?;

    let apply = |t: &[[f64; 3]; 3], p: [f64; 2]| [t[0][0] * p[0] + t[0][2], t[1][1] * p[1] + t[1][2]];

    // construct matrix A
    let mut mat_a = faer::Mat::<f64>::zeros(8, 9);
    for i in 0..4 {
        let (x1_i, x2_i) = (apply(&t1, x1[i]), apply(&t2, x2[i]));
        mat_a.write(2 * i, 0, x1_i[0]);
        mat_a.write(2 * i, 1, x1_i[1]);
        mat_a.write(2 * i, 2, 1.0);
        mat_a.write(2 * i, 6, -x2_i[0] * x1_i[0]);
        mat_a.write(2 * i, 7, -x2_i[0] * x1_i[1]);
        mat_a.write(2 * i, 8, -x2_i[0]);

        mat_a.write(2 * i + 1, 3, x1_i[0]);
        mat_a.write(2 * i + 1, 4, x1_i[1]);
        mat_a.write(2 * i + 1, 5, 1.0);
        mat_a.write(2 * i + 1, 6, -x2_i[1] * x1_i[0]);
        mat_a.write(2 * i + 1, 7, -x2_i[1] * x1_i[1]);
        mat_a.write(2 * i + 1, 8, -x2_i[1]);
    }

    // the solution is the right singular vector of the smallest singular value
    let svd = mat_a.svd();
    let h = svd.v().col(8);

    // unit frobenius norm in normalized coordinates
    let homo_n = [
        [h.read(0), h.read(1), h.read(2)],
        [h.read(3), h.read(4), h.read(5)],
        [h.read(6), h.read(7), h.read(8)],
    ];

    if linalg::det_mat33(&homo_n).abs() < 1e-8 {
        return Err(PoseError::DegenerateHomography("det is too small"));
    }

    let mut homo = linalg::mul_mat33(&t2_inv, &linalg::mul_mat33(&homo_n, &t1));

    let max_abs = homo.iter().flatten().map(|v| v.abs()).fold(0.0, f64::max);
    if homo[2][2].abs() < 1e-12 * max_abs {
        return Err(PoseError::DegenerateHomography("h33 is zero"));
    }
    linalg::normalize_mat33_inplace(&mut homo);

    if homo.iter().flatten().any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite);
    }

    Ok(homo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn apply(h: &[[f64; 3]; 3], p: [f64; 2]) -> [f64; 2] {
        let w = h[2][0] * p[0] + h[2][1] * p[1] + h[2][2];
        [
            (h[0][0] * p[0] + h[0][1] * p[1] + h[0][2]) / w,
            (h[1][0] * p[0] + h[1][1] * p[1] + h[1][2]) / w,
        ]
    }

    #[test]
    fn test_homography_4pt2d_identity() -> Result<(), PoseError> {
        let x1 = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let h = homography_4pt2d(&x1, &x1)?;
        for (i, row) in h.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                assert_relative_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-9);
            }
        }

        Ok(())
    }

    #[test]
    fn test_homography_4pt2d_perspective() -> Result<(), PoseError> {
        let h_gt = [[1.2, 0.1, 3.0], [-0.2, 0.9, -1.0], [0.01, 0.02, 1.0]];
        let x1 = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let x2 = x1.map(|p| apply(&h_gt, p));
        let h = homography_4pt2d(&x1, &x2)?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(h[i][j], h_gt[i][j], epsilon = 1e-8);
            }
        }

        Ok(())
    }

    #[test]
    fn test_homography_4pt2d_small_scale() -> Result<(), PoseError> {
        // a far away plane seen in normalized image coordinates
        let h_gt = [[1e-4, 2e-6, 3e-5], [-1e-6, 1e-4, -2e-5], [1e-6, 3e-6, 1.0]];
        let x1 = [[-0.1, 0.1], [0.1, 0.1], [0.1, -0.1], [-0.1, -0.1]];
        let x2 = x1.map(|p| apply(&h_gt, p));
        let h = homography_4pt2d(&x1, &x2)?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(h[i][j], h_gt[i][j], epsilon = 1e-12);
            }
        }

        Ok(())
    }

    #[test]
    fn test_homography_4pt2d_collinear() {
        let x1 = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let x2 = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(matches!(
            homography_4pt2d(&x1, &x2),
            Err(PoseError::DegenerateHomography(_))
        ));
        let same = [[5.0, 5.0]; 4];
        assert!(matches!(
            homography_4pt2d(&x1, &same),
            Err(PoseError::DegenerateHomography(_))
        ));
    }
}
