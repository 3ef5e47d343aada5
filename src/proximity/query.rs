//! Pairwise shape distance with shape-pair dispatch.
//!
//! Distances are signed: positive is the gap between the shapes, negative is
//! the penetration depth. A pair collides when the distance is `<= 0`.

use std::cmp::Ordering;

use glam::DVec3;
use log::debug;

use super::epa::epa;
use super::gjk::{closest_on_segment, gjk, GjkOutcome, GjkSettings};
use super::shape::{ConvexBody, Shape, SupportMap};
use crate::error::Result;
use crate::math::Transform;

/// Minimum distance between two posed shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub distance: f64,
    pub colliding: bool,
    /// Closest (or deepest) point on the first shape, world frame.
    pub point_a: DVec3,
    /// Closest (or deepest) point on the second shape, world frame.
    pub point_b: DVec3,
}

impl Separation {
    fn new(distance: f64, point_a: DVec3, point_b: DVec3) -> Self {
        Self {
            distance,
            colliding: distance <= 0.0,
            point_a,
            point_b,
        }
    }

    fn swapped(self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            ..self
        }
    }
}

/// Signed distance between `shape_a` at `pose_a` and `shape_b` at `pose_b`.
///
/// Symmetric: the arguments are put in a canonical order before dispatch, so
/// swapping them only swaps the witness points.
pub fn shape_distance(
    pose_a: &Transform,
    shape_a: &Shape,
    pose_b: &Transform,
    shape_b: &Shape,
    settings: &GjkSettings,
) -> Result<Separation> {
    shape_a.validate()?;
    shape_b.validate()?;

    if canonical_order(pose_a, shape_a, pose_b, shape_b) == Ordering::Greater {
        return Ok(dispatch(pose_b, shape_b, pose_a, shape_a, settings).swapped());
    }
    Ok(dispatch(pose_a, shape_a, pose_b, shape_b, settings))
}

/// Kind, then pose, then dimensions. Only bit-identical inputs compare
/// `Equal`, and those give the same result in either order.
fn canonical_order(pose_a: &Transform, a: &Shape, pose_b: &Transform, b: &Shape) -> Ordering {
    a.kind()
        .cmp(&b.kind())
        .then_with(|| lexicographic(&pose_a.to_array(), &pose_b.to_array()))
        .then_with(|| lexicographic(&a.dimensions(), &b.dimensions()))
}

fn lexicographic(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn dispatch(
    pose_a: &Transform,
    shape_a: &Shape,
    pose_b: &Transform,
    shape_b: &Shape,
    settings: &GjkSettings,
) -> Separation {
    match (shape_a, shape_b) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            balls(pose_a.position, *ra, pose_b.position, *rb)
        }
        (
            Shape::Sphere { radius: ra },
            Shape::Capsule {
                radius: rb,
                half_length,
            },
        ) => {
            let (s0, s1) = world_segment(pose_b, *half_length);
            let center = pose_a.position;
            let (_, on_segment) = closest_on_segment(s0 - center, s1 - center);
            balls(center, *ra, center + on_segment, *rb)
        }
        (
            Shape::Capsule {
                radius: ra,
                half_length: ha,
            },
            Shape::Capsule {
                radius: rb,
                half_length: hb,
            },
        ) => {
            let (p0, p1) = world_segment(pose_a, *ha);
            let (q0, q1) = world_segment(pose_b, *hb);
            let (ca, cb) = closest_between_segments(p0, p1, q0, q1);
            balls(ca, *ra, cb, *rb)
        }
        _ => convex_pair(pose_a, shape_a, pose_b, shape_b, settings),
    }
}

/// Two balls; also the final step of every point/segment-core pairing.
fn balls(ca: DVec3, ra: f64, cb: DVec3, rb: f64) -> Separation {
    let delta = cb - ca;
    let center_distance = delta.length();
    let normal = if center_distance > f64::EPSILON {
        delta / center_distance
    } else {
        DVec3::X
    };
    Separation::new(
        center_distance - ra - rb,
        ca + normal * ra,
        cb - normal * rb,
    )
}

fn world_segment(pose: &Transform, half_length: f64) -> (DVec3, DVec3) {
    let (s0, s1) = Shape::capsule_segment(half_length);
    (pose.transform_point(s0), pose.transform_point(s1))
}

/// Closest points between segments `p0p1` and `q0q1`
/// (Ericson, Real-Time Collision Detection, 5.1.9).
fn closest_between_segments(p0: DVec3, p1: DVec3, q0: DVec3, q1: DVec3) -> (DVec3, DVec3) {
    const EPS: f64 = 1e-14;
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (s, t) = if a <= EPS && e <= EPS {
        (0.0, 0.0)
    } else if a <= EPS {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPS {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPS {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p0 + d1 * s, q0 + d2 * t)
}

/// General convex pairing: GJK on the cores, margins added back on, EPA when
/// the cores themselves overlap.
fn convex_pair(
    pose_a: &Transform,
    shape_a: &Shape,
    pose_b: &Transform,
    shape_b: &Shape,
    settings: &GjkSettings,
) -> Separation {
    let core_a = ConvexBody::core(shape_a, *pose_a);
    let core_b = ConvexBody::core(shape_b, *pose_b);
    let margin_a = shape_a.margin();
    let margin_b = shape_b.margin();

    if let GjkOutcome::Separated {
        distance,
        point_a,
        point_b,
    } = gjk(&core_a, &core_b, settings)
    {
        let normal = (point_b - point_a) / distance;
        return Separation::new(
            distance - margin_a - margin_b,
            point_a + normal * margin_a,
            point_b - normal * margin_b,
        );
    }

    let full_a = ConvexBody::full(shape_a, *pose_a);
    let full_b = ConvexBody::full(shape_b, *pose_b);
    let simplex = match gjk(&full_a, &full_b, settings) {
        GjkOutcome::Intersecting { simplex } => simplex,
        // Cores touch within tolerance but the inflated shapes report a gap:
        // numerically a contact.
        GjkOutcome::Separated {
            point_a, point_b, ..
        } => return Separation::new(0.0, point_a, point_b),
    };

    match epa(&full_a, &full_b, &simplex, settings) {
        Some(p) => Separation::new(-p.depth, p.point_a, p.point_b),
        None => {
            debug!(
                "epa degenerate for {:?}/{:?}, reporting contact at zero depth",
                shape_a.kind(),
                shape_b.kind()
            );
            let mid = (pose_a.position + pose_b.position) * 0.5;
            Separation::new(0.0, mid, mid)
        }
    }
}
