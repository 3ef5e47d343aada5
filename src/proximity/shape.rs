use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::math::Transform;

/// Collision shape in its local frame.
///
/// Capsules and cylinders are aligned with the local Z axis and centered on
/// the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Sphere { radius: f64 },
    Capsule { radius: f64, half_length: f64 },
    Cuboid { half_extents: DVec3 },
    Cylinder { radius: f64, half_length: f64 },
    ConvexHull { points: Vec<DVec3> },
}

/// Shape kinds, in the order the pair dispatcher canonicalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Sphere,
    Capsule,
    Cuboid,
    Cylinder,
    ConvexHull,
}

/// Support mapping of a convex shape split into a core and a swept radius.
///
/// The full shape is the Minkowski sum of the core with a ball of radius
/// [`SupportMap::margin`]. Spheres are a point core, capsules a segment core.
pub trait SupportMap: Debug {
    /// Point of the core furthest along `direction`, in the local frame.
    fn local_support(&self, direction: DVec3) -> DVec3;

    fn margin(&self) -> f64 {
        0.0
    }
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    pub fn capsule(radius: f64, half_length: f64) -> Self {
        Self::Capsule {
            radius,
            half_length,
        }
    }

    pub fn cuboid(half_extents: DVec3) -> Self {
        Self::Cuboid { half_extents }
    }

    pub fn cylinder(radius: f64, half_length: f64) -> Self {
        Self::Cylinder {
            radius,
            half_length,
        }
    }

    pub fn convex_hull(points: Vec<DVec3>) -> Self {
        Self::ConvexHull { points }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Capsule { .. } => ShapeKind::Capsule,
            Self::Cuboid { .. } => ShapeKind::Cuboid,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::ConvexHull { .. } => ShapeKind::ConvexHull,
        }
    }

    /// Reject shapes no distance routine can handle: negative or non-finite
    /// dimensions, empty hulls.
    pub fn validate(&self) -> Result<()> {
        let dimension_ok = |v: f64| v.is_finite() && v >= 0.0;
        match self {
            Self::Sphere { radius } if !dimension_ok(*radius) => Err(Error::incompatible(
                format!("sphere radius must be finite and non-negative, got {radius}"),
            )),
            Self::Capsule {
                radius,
                half_length,
            }
            | Self::Cylinder {
                radius,
                half_length,
            } if !dimension_ok(*radius) || !dimension_ok(*half_length) => {
                Err(Error::incompatible(format!(
                    "{:?} dimensions must be finite and non-negative",
                    self.kind()
                )))
            }
            Self::Cuboid { half_extents }
                if !half_extents.is_finite() || half_extents.min_element() < 0.0 =>
            {
                Err(Error::incompatible(format!(
                    "cuboid half extents must be finite and non-negative, got {half_extents}"
                )))
            }
            Self::ConvexHull { points } if points.is_empty() => {
                Err(Error::incompatible("convex hull has no points"))
            }
            Self::ConvexHull { points } if points.iter().any(|p| !p.is_finite()) => {
                Err(Error::incompatible("convex hull has non-finite points"))
            }
            _ => Ok(()),
        }
    }

    /// The shape's parameters as a flat list, in declaration order.
    pub(crate) fn dimensions(&self) -> Vec<f64> {
        match self {
            Self::Sphere { radius } => vec![*radius],
            Self::Capsule {
                radius,
                half_length,
            }
            | Self::Cylinder {
                radius,
                half_length,
            } => vec![*radius, *half_length],
            Self::Cuboid { half_extents } => half_extents.to_array().to_vec(),
            Self::ConvexHull { points } => points.iter().flat_map(|p| p.to_array()).collect(),
        }
    }

    /// Radius of a ball around the local origin enclosing the whole shape.
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Capsule {
                radius,
                half_length,
            } => half_length + radius,
            Self::Cuboid { half_extents } => half_extents.length(),
            Self::Cylinder {
                radius,
                half_length,
            } => (radius * radius + half_length * half_length).sqrt(),
            Self::ConvexHull { points } => points.iter().map(|p| p.length()).fold(0.0, f64::max),
        }
    }

    /// End points of a capsule's core segment in its local frame.
    pub(crate) fn capsule_segment(half_length: f64) -> (DVec3, DVec3) {
        (
            DVec3::new(0.0, 0.0, -half_length),
            DVec3::new(0.0, 0.0, half_length),
        )
    }
}

impl SupportMap for Shape {
    fn local_support(&self, direction: DVec3) -> DVec3 {
        match self {
            Self::Sphere { .. } => DVec3::ZERO,
            Self::Capsule { half_length, .. } => {
                let z = if direction.z >= 0.0 {
                    *half_length
                } else {
                    -half_length
                };
                DVec3::new(0.0, 0.0, z)
            }
            Self::Cuboid { half_extents } => DVec3::new(
                half_extents.x.copysign(direction.x),
                half_extents.y.copysign(direction.y),
                half_extents.z.copysign(direction.z),
            ),
            Self::Cylinder {
                radius,
                half_length,
            } => {
                let radial = DVec3::new(direction.x, direction.y, 0.0);
                let radial_len = radial.length();
                let rim = if radial_len > 1e-12 {
                    radial * (radius / radial_len)
                } else {
                    DVec3::ZERO
                };
                let z = if direction.z >= 0.0 {
                    *half_length
                } else {
                    -half_length
                };
                DVec3::new(rim.x, rim.y, z)
            }
            Self::ConvexHull { points } => {
                let mut best = DVec3::ZERO;
                let mut best_dot = f64::NEG_INFINITY;
                for p in points {
                    let dot = p.dot(direction);
                    if dot > best_dot {
                        best_dot = dot;
                        best = *p;
                    }
                }
                best
            }
        }
    }

    fn margin(&self) -> f64 {
        match self {
            Self::Sphere { radius } | Self::Capsule { radius, .. } => *radius,
            _ => 0.0,
        }
    }
}

/// A shape placed in the world, optionally inflated by its margin.
#[derive(Debug, Clone, Copy)]
pub struct ConvexBody<'a> {
    pub shape: &'a Shape,
    pub pose: Transform,
    pub inflate: bool,
}

impl<'a> ConvexBody<'a> {
    /// The bare core of the shape (margin stripped).
    pub fn core(shape: &'a Shape, pose: Transform) -> Self {
        Self {
            shape,
            pose,
            inflate: false,
        }
    }

    /// The complete shape, margin included.
    pub fn full(shape: &'a Shape, pose: Transform) -> Self {
        Self {
            shape,
            pose,
            inflate: true,
        }
    }

    pub fn support(&self, direction: DVec3) -> DVec3 {
        let local_dir = self.pose.inverse_transform_direction(direction);
        let core = self.pose.transform_point(self.shape.local_support(local_dir));
        if self.inflate {
            core + direction.normalize_or_zero() * self.shape.margin()
        } else {
            core
        }
    }

    pub fn center(&self) -> DVec3 {
        self.pose.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_support_cuboid() {
        let shape = Shape::cuboid(DVec3::new(1.0, 2.0, 3.0));
        let s = shape.local_support(DVec3::new(1.0, -1.0, 1.0));
        assert_eq!(s, DVec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_support_cylinder_rim() {
        let shape = Shape::cylinder(0.5, 1.0);
        let s = shape.local_support(DVec3::new(1.0, 0.0, -1.0));
        assert_relative_eq!(s.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(s.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inflated_sphere_support() {
        let shape = Shape::sphere(0.5);
        let body = ConvexBody::full(&shape, Transform::from_position(DVec3::new(1.0, 2.0, 3.0)));
        let s = body.support(DVec3::new(0.0, 0.0, 2.0));
        assert!(s.abs_diff_eq(DVec3::new(1.0, 2.0, 3.5), 1e-12));

        let core = ConvexBody::core(&shape, body.pose);
        assert!(core.support(DVec3::Z).abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), 1e-12));
    }

    #[test]
    fn test_rotated_capsule_support() {
        let shape = Shape::capsule(0.1, 1.0);
        // Capsule axis turned onto world X.
        let pose = Transform::from_axis_angle(DVec3::Y, std::f64::consts::FRAC_PI_2);
        let body = ConvexBody::core(&shape, pose);
        let s = body.support(DVec3::X);
        assert!(s.abs_diff_eq(DVec3::X, 1e-12));
    }

    #[test]
    fn test_validate() {
        assert!(Shape::sphere(0.0).validate().is_ok());
        assert!(Shape::sphere(-1.0).validate().is_err());
        assert!(Shape::capsule(0.1, f64::NAN).validate().is_err());
        assert!(Shape::cuboid(DVec3::new(1.0, -1.0, 1.0)).validate().is_err());
        assert!(matches!(
            Shape::convex_hull(Vec::new()).validate(),
            Err(Error::IncompatibleGeometry { .. })
        ));
    }

    #[test]
    fn test_bounding_radius() {
        assert_relative_eq!(Shape::capsule(0.5, 1.0).bounding_radius(), 1.5);
        assert_relative_eq!(
            Shape::cuboid(DVec3::new(1.0, 2.0, 2.0)).bounding_radius(),
            3.0
        );
    }

    #[test]
    fn test_serde_tagging() {
        let shape: Shape =
            serde_json::from_str(r#"{"type":"capsule","radius":0.1,"half_length":0.4}"#)
                .unwrap();
        assert_eq!(shape, Shape::capsule(0.1, 0.4));
        let hull: Shape =
            serde_json::from_str(r#"{"type":"convex_hull","points":[[0,0,0],[1,0,0]]}"#).unwrap();
        assert_eq!(hull.kind(), ShapeKind::ConvexHull);
    }
}
