use glam::{DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

/// Rigid transform: a rotation followed by a translation.
///
/// Orientation is always a unit quaternion; Euler angles only appear as an
/// input format through [`Transform::from_xyz_rpy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            position: DVec3::ZERO,
            rotation,
        }
    }

    pub fn from_position_rotation(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// URDF-style origin: translation `xyz`, fixed-axis roll/pitch/yaw
    /// (`R = Rz(yaw) * Ry(pitch) * Rx(roll)`).
    pub fn from_xyz_rpy(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self {
            position: DVec3::from_array(xyz),
            rotation: DQuat::from_euler(EulerRot::ZYX, rpy[2], rpy[1], rpy[0]),
        }
    }

    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        Self::from_rotation(DQuat::from_axis_angle(axis, angle))
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.position + self.rotation * other.position,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate();
        Self {
            position: -(rotation * self.position),
            rotation,
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.position
    }

    pub fn transform_direction(&self, direction: DVec3) -> DVec3 {
        self.rotation * direction
    }

    /// Map a world direction into this frame.
    pub fn inverse_transform_direction(&self, direction: DVec3) -> DVec3 {
        self.rotation.conjugate() * direction
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }

    /// Equal within `max_abs_diff`, treating `q` and `-q` as the same rotation.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f64) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }

    /// `[tx, ty, tz, qx, qy, qz, qw]`
    pub fn to_array(&self) -> [f64; 7] {
        let p = self.position;
        let q = self.rotation;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
    }

    pub fn from_array(values: [f64; 7]) -> Self {
        Self {
            position: DVec3::new(values[0], values[1], values[2]),
            rotation: DQuat::from_xyzw(values[3], values[4], values[5], values[6]),
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}
