/// Compute the determinant of a 3x3 matrix.
pub fn det_mat33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Normalize a 3x3 matrix in place so that its last element is one.
///
/// The matrix is left unchanged if its last element is zero.
pub fn normalize_mat33_inplace(m: &mut [[f64; 3]; 3]) {
    let s = m[2][2];
    if s == 0.0 {
        return;
    }
    for row in m.iter_mut() {
        for v in row.iter_mut() {
            *v /= s;
        }
    }
}

/// Multiply two 3x3 matrices.
pub fn mul_mat33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Compute the cross product of two 3d vectors.
pub fn cross_vec3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Compute the euclidean norm of a 3d vector.
pub fn norm_vec3(a: &[f64; 3]) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

/// Project a 3x3 matrix onto the closest rotation matrix (Frobenius norm).
///
/// Uses the SVD `M = U S V^T` and returns `U diag(1, 1, det(U V^T)) V^T`.
pub fn project_to_so3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mat = faer::mat![
        [m[0][0], m[0][1], m[0][2]],
        [m[1][0], m[1][1], m[1][2]],
        [m[2][0], m[2][1], m[2][2]],
    ];
    let svd = mat.svd();
    let u = svd.u();
    let v = svd.v();

    let uvt = u * v.transpose();
    let mut r = [[0.0; 3]; 3];
    for (i, row) in r.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = uvt.read(i, j);
        }
    }

    if det_mat33(&r) < 0.0 {
        // flip the singular direction with the smallest singular value
        for (i, row) in r.iter_mut().enumerate() {
            for (j, val) in row.iter_mut().enumerate() {
                *val -= 2.0 * u.read(i, 2) * v.read(j, 2);
            }
        }
    }

    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_det_mat33() {
        let m = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [1.0, 0.0, 4.0]];
        assert_relative_eq!(det_mat33(&m), 24.0);
    }

    #[test]
    fn test_mul_mat33() {
        let a = [[1.0, 2.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let b = [[1.0, 0.0, 0.0], [3.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        assert_eq!(
            mul_mat33(&a, &b),
            [[7.0, 2.0, 0.0], [3.0, 1.0, 0.0], [0.0, 2.0, 2.0]]
        );
    }

    #[test]
    fn test_cross_vec3() {
        assert_eq!(
            cross_vec3(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]),
            [0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_project_to_so3() {
        // a slightly scaled and perturbed rotation about z
        let (c, s) = (0.3f64.cos(), 0.3f64.sin());
        let m = [
            [1.02 * c, -s + 0.01, 0.0],
            [s, 0.98 * c, 0.005],
            [0.0, -0.003, 1.01],
        ];
        let r = project_to_so3(&m);
        assert_relative_eq!(det_mat33(&r), 1.0, epsilon = 1e-12);
        for i in 0..3 {
            for j in 0..3 {
                let dot = (0..3).map(|k| r[i][k] * r[j][k]).sum::<f64>();
                assert_relative_eq!(dot, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(r[0][0], c, epsilon = 2e-2);
    }
}
