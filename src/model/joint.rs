use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::Transform;

/// Closed interval of admissible joint values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl JointLimits {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(Error::parse(format!(
                "joint limits must be finite, got [{lower}, {upper}]"
            )));
        }
        if lower > upper {
            return Err(Error::parse(format!(
                "lower limit {lower} exceeds upper limit {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

/// Joint type together with the data its motion needs.
///
/// A revolute joint without limits is continuous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JointKind {
    Revolute {
        axis: DVec3,
        limits: Option<JointLimits>,
    },
    Prismatic {
        axis: DVec3,
        limits: Option<JointLimits>,
    },
    Fixed,
}

impl JointKind {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed)
    }

    pub fn axis(&self) -> Option<DVec3> {
        match self {
            Self::Revolute { axis, .. } | Self::Prismatic { axis, .. } => Some(*axis),
            Self::Fixed => None,
        }
    }

    pub fn limits(&self) -> Option<&JointLimits> {
        match self {
            Self::Revolute { limits, .. } | Self::Prismatic { limits, .. } => limits.as_ref(),
            Self::Fixed => None,
        }
    }

    /// Transform contributed by the joint variable `q`, applied after the
    /// joint origin.
    pub fn motion(&self, q: f64) -> Transform {
        match self {
            Self::Revolute { axis, .. } => {
                Transform::from_rotation(DQuat::from_axis_angle(*axis, q))
            }
            Self::Prismatic { axis, .. } => Transform::from_position(*axis * q),
            Self::Fixed => Transform::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    /// Index of the parent link in the chain.
    pub parent: usize,
    /// Index of the child link in the chain.
    pub child: usize,
    /// Parent link frame to joint frame.
    pub origin: Transform,
}

impl Joint {
    pub fn is_fixed(&self) -> bool {
        self.kind.is_fixed()
    }
}

/// Unit-length copy of `axis`, or `InvalidAxis` if it has no direction.
pub(crate) fn normalize_axis(joint: &str, axis: DVec3) -> Result<DVec3> {
    if !axis.is_finite() {
        return Err(Error::InvalidAxis {
            joint: joint.to_string(),
        });
    }
    axis.try_normalize().ok_or_else(|| Error::InvalidAxis {
        joint: joint.to_string(),
    })
}
