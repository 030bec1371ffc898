//! Surface normals of marker poses and their batch statistics.
//!
//! A marker normal is the canonical "up" axis `(0, 0, 1)` of the marker
//! frame rotated into the camera frame.

use glam::DVec3;

use crate::so3::SO3;

/// The canonical marker axis that is rotated into the normal.
pub const REFERENCE_NORMAL: [f64; 3] = [0.0, 0.0, 1.0];

/// The normal of a marker that faces the camera.
pub const TARGET_NORMAL: [f64; 3] = [0.0, 0.0, -1.0];

const PARALLEL_EPS: f64 = 1e-9;

/// Errors raised by the aggregation operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AggregateError {
    /// The variance needs at least two observations.
    #[error("At least 2 rotation vectors are required, got {0}")]
    InsufficientData(usize),

    /// The normal is anti-parallel to the target so the tilt axis is undefined.
    #[error("Tilt axis is undefined: normal is anti-parallel to the target (tilt = {0} rad)")]
    DegenerateAxis(f64),

    /// The normals cancel out and have no mean direction.
    #[error("The sum of the normals is zero")]
    UndefinedMean,

    /// A vector contains NaN or infinite values.
    #[error("Vector at index {0} is not finite")]
    NonFinite(usize),

    /// A direction argument has zero length.
    #[error("Direction {0:?} has zero length")]
    ZeroDirection([f64; 3]),
}

/// Mean direction and per-axis spread of a set of marker normals.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEstimate {
    /// Unit vector along the sum of the normals.
    pub mean_normal: [f64; 3],
    /// Sample variance (n - 1 denominator) of each normal component.
    pub variance: [f64; 3],
}

/// Angles separating a marker orientation from a target normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwistTilt {
    /// Angle between the x axis and the marker x axis once the marker is tilted onto the target.
    pub twist: f64,
    /// Angle between the marker normal and the target normal.
    pub tilt: f64,
}

/// Compute the unit surface normal of a rotation vector.
///
/// # Example
///
/// ```
/// use markerpose_3d::normal_from_rotation;
///
/// let n = normal_from_rotation([std::f64::consts::PI, 0.0, 0.0]);
/// assert!((n[2] + 1.0).abs() < 1e-12);
/// ```
pub fn normal_from_rotation(rvec: [f64; 3]) -> [f64; 3] {
    SO3::exp(DVec3::from_array(rvec))
        .rotate(DVec3::from_array(REFERENCE_NORMAL))
        .to_array()
}

fn unit(v: [f64; 3]) -> Result<DVec3, AggregateError> {
    let d = DVec3::from_array(v);
    if !d.is_finite() {
        return Err(AggregateError::NonFinite(0));
    }
    d.try_normalize().ok_or(AggregateError::ZeroDirection(v))
}

/// Aggregate a batch of rotation vectors into a mean normal and its variance.
///
/// The mean is the normalized sum of the normals. The variance is computed
/// per axis over the individual normals with Bessel's correction.
///
/// # Errors
///
/// Fails with [`AggregateError::InsufficientData`] for fewer than two vectors.
pub fn aggregate(rvecs: &[[f64; 3]]) -> Result<NormalEstimate, AggregateError> {
    let n = rvecs.len();
    if n < 2 {
        return Err(AggregateError::InsufficientData(n));
    }
    if let Some(i) = rvecs.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
        return Err(AggregateError::NonFinite(i));
    }

    let normals = rvecs
        .iter()
        .map(|r| normal_from_rotation(*r))
        .collect::<Vec<_>>();

    let sum = normals
        .iter()
        .fold(DVec3::ZERO, |acc, v| acc + DVec3::from_array(*v));
    if sum.length() < PARALLEL_EPS {
        return Err(AggregateError::UndefinedMean);
    }
    let mean_normal = sum.normalize().to_array();

    // shifted data variance: identical samples give exactly zero
    let shift = normals[0];
    let mut variance = [0.0; 3];
    for (axis, var) in variance.iter_mut().enumerate() {
        let (mut s, mut s2) = (0.0, 0.0);
        for v in normals.iter() {
            let d = v[axis] - shift[axis];
            s += d;
            s2 += d * d;
        }
        *var = ((s2 - s * s / n as f64) / (n - 1) as f64).max(0.0);
    }

    Ok(NormalEstimate {
        mean_normal,
        variance,
    })
}

/// Split a rotation into the tilt needed to bring its normal onto `target`
/// and the residual twist about that normal.
///
/// Both angles are unsigned, in [0, π].
///
/// # Arguments
///
/// * `rvec` - The rotation vector of the marker.
/// * `target` - The normal to tilt onto, usually [`TARGET_NORMAL`].
/// * `reference` - The marker axis that defines its normal, usually [`REFERENCE_NORMAL`].
///
/// # Errors
///
/// Fails with [`AggregateError::DegenerateAxis`] when the normal is
/// anti-parallel to the target. A normal already aligned with the target
/// yields a zero tilt.
pub fn twist_tilt_decompose(
    rvec: [f64; 3],
    target: [f64; 3],
    reference: [f64; 3],
) -> Result<TwistTilt, AggregateError> {
    if rvec.iter().any(|v| !v.is_finite()) {
        return Err(AggregateError::NonFinite(0));
    }
    let target = unit(target)?;
    let reference = unit(reference)?;

    let rotation = SO3::exp(DVec3::from_array(rvec));
    let normal = rotation.rotate(reference).normalize();

    let tilt = normal.dot(target).clamp(-1.0, 1.0).acos();
    let axis = normal.cross(target);
    let axis_norm = axis.length();

    let correction = if axis_norm < PARALLEL_EPS {
        if normal.dot(target) < 0.0 {
            return Err(AggregateError::DegenerateAxis(tilt));
        }
        SO3::IDENTITY
    } else {
        SO3::exp(axis / axis_norm * tilt)
    };

    let new_x = correction.rotate(rotation.rotate(DVec3::X));
    let twist = DVec3::X.dot(new_x).clamp(-1.0, 1.0).acos();

    Ok(TwistTilt { twist, tilt })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    fn random_rvec(rng: &mut StdRng) -> [f64; 3] {
        [
            rng.random_range(-2.0..2.0),
            rng.random_range(-2.0..2.0),
            rng.random_range(-2.0..2.0),
        ]
    }

    #[test]
    fn normal_is_unit() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let n = normal_from_rotation(random_rvec(&mut rng));
            let norm = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn normal_of_identity() {
        assert_eq!(normal_from_rotation([0.0; 3]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn aggregate_identical() -> Result<(), AggregateError> {
        let rvec = [0.3, -2.1, 0.7];
        let estimate = aggregate(&[rvec; 5])?;
        let expected = normal_from_rotation(rvec);
        for i in 0..3 {
            assert_relative_eq!(estimate.mean_normal[i], expected[i], epsilon = 1e-12);
        }
        assert_eq!(estimate.variance, [0.0, 0.0, 0.0]);

        Ok(())
    }

    #[test]
    fn aggregate_insufficient() {
        assert_eq!(aggregate(&[]), Err(AggregateError::InsufficientData(0)));
        assert_eq!(
            aggregate(&[[0.1, 0.2, 0.3]]),
            Err(AggregateError::InsufficientData(1))
        );
    }

    #[test]
    fn aggregate_renormalizes_sum() -> Result<(), AggregateError> {
        // normals (0, 0, 1) and (1, 0, 0)
        let estimate = aggregate(&[[0.0, 0.0, 0.0], [0.0, PI / 2.0, 0.0]])?;
        let h = 1.0 / 2f64.sqrt();
        assert_relative_eq!(estimate.mean_normal[0], h, epsilon = 1e-12);
        assert_relative_eq!(estimate.mean_normal[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(estimate.mean_normal[2], h, epsilon = 1e-12);
        // sample variance of {0, 1} is 0.5
        assert_relative_eq!(estimate.variance[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(estimate.variance[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(estimate.variance[2], 0.5, epsilon = 1e-12);

        Ok(())
    }

    #[test]
    fn aggregate_opposite_normals() {
        assert_eq!(
            aggregate(&[[0.0, 0.0, 0.0], [PI, 0.0, 0.0]]),
            Err(AggregateError::UndefinedMean)
        );
    }

    #[test]
    fn aggregate_rejects_nan() {
        assert_eq!(
            aggregate(&[[0.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]]),
            Err(AggregateError::NonFinite(1))
        );
    }

    #[test]
    fn twist_tilt_aligned_with_target() -> Result<(), AggregateError> {
        // the identity normal already equals the target
        let tt = twist_tilt_decompose([0.0; 3], REFERENCE_NORMAL, REFERENCE_NORMAL)?;
        assert_relative_eq!(tt.tilt, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tt.twist, 0.0, epsilon = 1e-12);

        Ok(())
    }

    #[test]
    fn twist_tilt_anti_parallel_is_degenerate() {
        let res = twist_tilt_decompose([0.0; 3], TARGET_NORMAL, REFERENCE_NORMAL);
        assert!(matches!(res, Err(AggregateError::DegenerateAxis(t)) if (t - PI).abs() < 1e-9));
    }

    #[test]
    fn twist_tilt_facing_camera() -> Result<(), AggregateError> {
        // half turn about x then a quarter turn about the normal
        let rotation = SO3::exp(DVec3::new(0.0, 0.0, -PI / 2.0)) * SO3::exp(DVec3::new(PI, 0.0, 0.0));
        let rvec = rotation.log().to_array();
        let tt = twist_tilt_decompose(rvec, TARGET_NORMAL, REFERENCE_NORMAL)?;
        assert_relative_eq!(tt.tilt, 0.0, epsilon = 1e-7);
        assert_relative_eq!(tt.twist, PI / 2.0, epsilon = 1e-7);

        Ok(())
    }

    #[test]
    fn twist_tilt_pure_tilt() -> Result<(), AggregateError> {
        // tilt a camera-facing marker by 0.3 rad about x
        let rvec = [PI - 0.3, 0.0, 0.0];
        let tt = twist_tilt_decompose(rvec, TARGET_NORMAL, REFERENCE_NORMAL)?;
        assert_relative_eq!(tt.tilt, 0.3, epsilon = 1e-9);
        assert_relative_eq!(tt.twist, 0.0, epsilon = 1e-7);

        Ok(())
    }

    #[test]
    fn twist_tilt_angles_in_range() -> Result<(), AggregateError> {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let tt = twist_tilt_decompose(random_rvec(&mut rng), TARGET_NORMAL, REFERENCE_NORMAL)?;
            assert!((0.0..=PI).contains(&tt.tilt));
            assert!((0.0..=PI).contains(&tt.twist));
        }

        Ok(())
    }

    #[test]
    fn twist_tilt_zero_target() {
        assert_eq!(
            twist_tilt_decompose([0.1, 0.0, 0.0], [0.0; 3], REFERENCE_NORMAL),
            Err(AggregateError::ZeroDirection([0.0; 3]))
        );
    }
}
