use glam::{DMat3, DQuat, DVec3};

/// A 3d rotation stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    /// The unit quaternion.
    pub q: DQuat,
}

impl SO3 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: DQuat::IDENTITY };

    /// Create a rotation from a rotation matrix.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self {
            q: DQuat::from_mat3(mat).normalize(),
        }
    }

    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// The inverse rotation.
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }

    /// Rotate a vector.
    pub fn rotate(&self, v: DVec3) -> DVec3 {
        self.q * v
    }

    /// Lie algebra -> Lie group
    ///
    /// The input is a rotation vector: its direction is the axis and its norm the angle.
    pub fn exp(v: DVec3) -> Self {
        let theta = v.length();
        let theta_half = theta / 2.0;

        let (w, b) = if theta > 1e-12 {
            (theta_half.cos(), theta_half.sin() / theta)
        } else {
            // second order expansion of sin(theta/2)/theta
            (1.0 - theta * theta / 8.0, 0.5 - theta * theta / 48.0)
        };
        let xyz = b * v;

        Self {
            q: DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize(),
        }
    }

    /// Lie group -> Lie algebra
    ///
    /// The returned rotation vector has a norm in [0, π].
    pub fn log(&self) -> DVec3 {
        // q and -q are the same rotation, pick the one with w >= 0
        let q = if self.q.w < 0.0 { -self.q } else { self.q };
        let vec = DVec3::new(q.x, q.y, q.z);
        let sin_half = vec.length();

        if sin_half < 1e-12 {
            return 2.0 * vec / q.w;
        }

        let theta = 2.0 * sin_half.atan2(q.w);
        vec * (theta / sin_half)
    }
}

impl std::ops::Mul for SO3 {
    type Output = SO3;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            q: (self.q * rhs.q).normalize(),
        }
    }
}

/// Convert a rotation vector to a row-major rotation matrix.
pub fn rotation_matrix_from_vector(rvec: [f64; 3]) -> [[f64; 3]; 3] {
    let m = SO3::exp(DVec3::from_array(rvec)).matrix();
    [
        [m.x_axis.x, m.y_axis.x, m.z_axis.x],
        [m.x_axis.y, m.y_axis.y, m.z_axis.y],
        [m.x_axis.z, m.y_axis.z, m.z_axis.z],
    ]
}

/// Convert a row-major rotation matrix to a rotation vector.
pub fn rotation_vector_from_matrix(r: &[[f64; 3]; 3]) -> [f64; 3] {
    let m = DMat3::from_cols(
        DVec3::new(r[0][0], r[1][0], r[2][0]),
        DVec3::new(r[0][1], r[1][1], r[2][1]),
        DVec3::new(r[0][2], r[1][2], r[2][2]),
    );
    SO3::from_matrix(&m).log().to_array()
}
