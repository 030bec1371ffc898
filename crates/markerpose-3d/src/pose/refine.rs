//! Levenberg–Marquardt pose refinement.

use glam::DVec3;
use markerpose_imgproc::calibration::CameraIntrinsic;

use crate::error::PoseError;
use crate::so3::SO3;

/// Parameters controlling the LM pose refinement.
#[derive(Debug, Clone)]
pub struct LMParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Convergence threshold on squared reprojection error decrease.
    pub eps: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LMParams {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-12,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Refine a pose (rvec, t) with Levenberg–Marquardt to minimize pixel reprojection error.
///
/// - `points_world`: World points (N,3)
/// - `points_image`: Undistorted pixel points (N,2)
/// - `intrinsic`: Pinhole intrinsics
/// - `rvec`: Initial axis-angle rotation (input/output)
/// - `t`: Initial translation (input/output)
///
/// Returns `(rmse, num_iters, converged)` and writes refined `rvec` and `t` in place.
pub fn refine_pose_lm(
    points_world: &[[f64; 3]],
    points_image: &[[f64; 2]],
    intrinsic: &CameraIntrinsic,
    rvec: &mut [f64; 3],
    t: &mut [f64; 3],
    params: &LMParams,
) -> Result<(f64, usize, bool), PoseError> {
    if points_world.len() != points_image.len() {
        return Err(PoseError::MismatchedArrayLengths(
            points_world.len(),
            points_image.len(),
        ));
    }

    let n = points_world.len();

    // x = [rx, ry, rz, tx, ty, tz]
    let mut x = [rvec[0], rvec[1], rvec[2], t[0], t[1], t[2]];

    let mut residuals = vec![0.0f64; 2 * n];
    let mut residuals_p = vec![0.0f64; 2 * n];
    let mut residuals_m = vec![0.0f64; 2 * n];

    let project_all_in_place = |x: &[f64; 6], out: &mut [f64]| -> f64 {
        let rot = SO3::exp(DVec3::new(x[0], x[1], x[2]));
        let t_vec = DVec3::new(x[3], x[4], x[5]);

        let mut sum_sq = 0.0;
        for (i, (pw, uv)) in points_world.iter().zip(points_image.iter()).enumerate() {
            let pc = rot.rotate(DVec3::from_array(*pw)) + t_vec;
            let (u_hat, v_hat) = intrinsic.denormalize(pc.x / pc.z, pc.y / pc.z);
            let du = u_hat - uv[0];
            let dv = v_hat - uv[1];
            out[2 * i] = du;
            out[2 * i + 1] = dv;
            sum_sq += du.mul_add(du, dv * dv);
        }
        sum_sq
    };

    let mut lambda = params.lambda_init;
    let mut err_sq_base = project_all_in_place(&x, &mut residuals);

    let mut iters = 0usize;
    let mut converged = false;

    let mut j = vec![0.0f64; 2 * n * 6];

    while iters < params.max_iters {
        iters += 1;
        let mut a = [0.0f64; 36];
        let mut b = [0.0f64; 6];

        const H_ROT: f64 = 1e-6;
        let t_scale = x[3].abs().max(x[4].abs()).max(x[5].abs()).max(1e-3);
        let h_trans = 1e-6 * t_scale;

        // central differences
        for k_idx in 0..6 {
            let h = if k_idx < 3 { H_ROT } else { h_trans };
            let mut x_plus = x;
            let mut x_minus = x;
            x_plus[k_idx] += h;
            x_minus[k_idx] -= h;
            project_all_in_place(&x_plus, &mut residuals_p);
            project_all_in_place(&x_minus, &mut residuals_m);
            for i in 0..(2 * n) {
                j[i * 6 + k_idx] = (residuals_p[i] - residuals_m[i]) / (2.0 * h);
            }
        }

        // (J^T J + lambda I) delta = -J^T r
        for r_i in 0..(2 * n) {
            let r_val = residuals[r_i];
            for c in 0..6 {
                let j_ic = j[r_i * 6 + c];
                b[c] += j_ic * r_val;
                for d in 0..6 {
                    a[c * 6 + d] += j_ic * j[r_i * 6 + d];
                }
            }
        }
        for d in 0..6 {
            a[d * 6 + d] += lambda;
        }

        let mut rhs = b.map(|v| -v);
        match solve_6x6(&mut a, &mut rhs) {
            Some(delta) => {
                let mut x_new = x;
                for i in 0..6 {
                    x_new[i] += delta[i];
                }
                let err_sq_new = project_all_in_place(&x_new, &mut residuals_p);
                if err_sq_new.is_finite() && err_sq_new < err_sq_base {
                    x = x_new;
                    residuals.copy_from_slice(&residuals_p);
                    let decrease = err_sq_base - err_sq_new;
                    err_sq_base = err_sq_new;
                    if decrease < params.eps {
                        converged = true;
                        break;
                    }
                    lambda = (lambda / params.lambda_mul).max(1e-12);
                } else {
                    lambda *= params.lambda_mul;
                }
            }
            None => lambda *= params.lambda_mul,
        }
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite);
    }

    rvec.copy_from_slice(&x[0..3]);
    t.copy_from_slice(&x[3..6]);

    let rmse = (err_sq_base / (2.0 * n.max(1) as f64)).sqrt();
    Ok((rmse, iters, converged))
}

// Dense 6x6 solver using Gaussian elimination with partial pivoting.
fn solve_6x6(a: &mut [f64; 36], b: &mut [f64; 6]) -> Option<[f64; 6]> {
    for i in 0..6 {
        let mut piv = i;
        let mut max_val = a[i * 6 + i].abs();
        for r in (i + 1)..6 {
            let v = a[r * 6 + i].abs();
            if v > max_val {
                max_val = v;
                piv = r;
            }
        }
        if max_val < 1e-18 {
            return None;
        }
        if piv != i {
            for c in 0..6 {
                a.swap(i * 6 + c, piv * 6 + c);
            }
            b.swap(i, piv);
        }
        let diag = a[i * 6 + i];
        for c in i..6 {
            a[i * 6 + c] /= diag;
        }
        b[i] /= diag;
        for r in (i + 1)..6 {
            let factor = a[r * 6 + i];
            if factor == 0.0 {
                continue;
            }
            for c in i..6 {
                a[r * 6 + c] -= factor * a[i * 6 + c];
            }
            b[r] -= factor * b[i];
        }
    }
    // back substitution
    for i in (0..6).rev() {
        for r in 0..i {
            let factor = a[r * 6 + i];
            if factor != 0.0 {
                a[r * 6 + i] = 0.0;
                b[r] -= factor * b[i];
            }
        }
    }
    Some(*b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_6x6_diagonal() {
        let mut a = [0.0; 36];
        for i in 0..6 {
            a[i * 6 + i] = (i + 1) as f64;
        }
        let mut b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = solve_6x6(&mut a, &mut b).unwrap();
        for v in x {
            assert_relative_eq!(v, 1.0);
        }
    }

    #[test]
    fn test_refine_lm_recovers_pose() -> Result<(), PoseError> {
        let intrinsic = CameraIntrinsic {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
        };
        let points_world = [
            [-0.05, 0.05, 0.0],
            [0.05, 0.05, 0.0],
            [0.05, -0.05, 0.0],
            [-0.05, -0.05, 0.0],
            [0.0, 0.0, 0.02],
        ];
        let rvec_gt = [2.9, 0.2, -0.1];
        let t_gt = [0.02, -0.01, 0.6];

        let rot = SO3::exp(DVec3::from_array(rvec_gt));
        let points_image = points_world.map(|p| {
            let pc = rot.rotate(DVec3::from_array(p)) + DVec3::from_array(t_gt);
            let (u, v) = intrinsic.denormalize(pc.x / pc.z, pc.y / pc.z);
            [u, v]
        });

        let mut rvec = [2.85, 0.25, -0.05];
        let mut t = [0.025, -0.015, 0.62];
        let (rmse, _, _) = refine_pose_lm(
            &points_world,
            &points_image,
            &intrinsic,
            &mut rvec,
            &mut t,
            &LMParams::default(),
        )?;

        assert!(rmse < 1e-6);
        for i in 0..3 {
            assert_relative_eq!(rvec[i], rvec_gt[i], epsilon = 1e-6);
            assert_relative_eq!(t[i], t_gt[i], epsilon = 1e-7);
        }

        Ok(())
    }
}
