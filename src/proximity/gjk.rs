//! GJK (Gilbert-Johnson-Keerthi) distance between convex bodies.
//!
//! Works on the Minkowski difference `A - B`: the distance between the bodies
//! is the distance from the origin to that set. Each iteration adds one support
//! point and reduces the simplex to the smallest sub-simplex containing the
//! point closest to the origin. Witness points on A and B are carried along
//! with every simplex vertex and recombined with the same barycentric weights.

use glam::DVec3;

use super::shape::ConvexBody;

/// Iteration and tolerance settings for GJK and EPA.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GjkSettings {
    pub max_iterations: u32,
    /// Relative convergence tolerance on the squared distance.
    pub tolerance: f64,
    pub epa_max_iterations: u32,
    /// Absolute convergence tolerance on EPA face distances.
    pub epa_tolerance: f64,
}

impl Default for GjkSettings {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            tolerance: 1e-10,
            epa_max_iterations: 64,
            epa_tolerance: 1e-9,
        }
    }
}

/// Squared distance below which the origin counts as touching the simplex.
const TOUCH_EPSILON_SQ: f64 = 1e-20;

/// A vertex of the Minkowski difference with its witnesses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    /// `a - b`
    pub point: DVec3,
    pub a: DVec3,
    pub b: DVec3,
}

impl SupportPoint {
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self { point: a - b, a, b }
    }
}

/// Support point of `A - B` along `direction`.
pub fn minkowski_support(a: &ConvexBody, b: &ConvexBody, direction: DVec3) -> SupportPoint {
    SupportPoint::new(a.support(direction), b.support(-direction))
}

#[derive(Debug, Clone, Default)]
pub struct Simplex {
    points: Vec<SupportPoint>,
}

impl Simplex {
    pub fn points(&self) -> &[SupportPoint] {
        &self.points
    }

    fn contains(&self, p: DVec3) -> bool {
        self.points
            .iter()
            .any(|s| s.point.distance_squared(p) <= TOUCH_EPSILON_SQ)
    }
}

#[derive(Debug, Clone)]
pub enum GjkOutcome {
    /// The bodies are apart by `distance`; witnesses lie on each body.
    Separated {
        distance: f64,
        point_a: DVec3,
        point_b: DVec3,
    },
    /// The bodies overlap (or touch); the simplex encloses the origin as far
    /// as GJK could tell and seeds EPA.
    Intersecting { simplex: Simplex },
}

pub fn gjk(a: &ConvexBody, b: &ConvexBody, settings: &GjkSettings) -> GjkOutcome {
    let mut v = a.center() - b.center();
    if v.length_squared() < TOUCH_EPSILON_SQ {
        v = DVec3::X;
    }

    let first = minkowski_support(a, b, -v);
    let mut simplex = Simplex {
        points: vec![first],
    };
    let mut closest = Closest {
        point: first.point,
        weights: vec![1.0],
    };
    v = first.point;

    for _ in 0..settings.max_iterations {
        let v_len_sq = v.length_squared();
        if v_len_sq <= TOUCH_EPSILON_SQ {
            return GjkOutcome::Intersecting { simplex };
        }

        let w = minkowski_support(a, b, -v);

        // No progress towards the origin: v is the closest point.
        if v_len_sq - v.dot(w.point) <= settings.tolerance * v_len_sq || simplex.contains(w.point)
        {
            break;
        }

        simplex.points.push(w);
        match closest_on_simplex(&simplex.points) {
            Some(c) => {
                let reduced: Vec<SupportPoint> = simplex
                    .points
                    .iter()
                    .zip(&c.weights)
                    .filter(|(_, w)| **w > 0.0)
                    .map(|(p, _)| *p)
                    .collect();
                let weights: Vec<f64> = c.weights.iter().copied().filter(|w| *w > 0.0).collect();
                simplex.points = reduced;
                closest = Closest {
                    point: c.point,
                    weights,
                };
            }
            // Origin inside the tetrahedron.
            None => return GjkOutcome::Intersecting { simplex },
        }

        // Guard against numerical cycling: the distance must strictly drop.
        if closest.point.length_squared() >= v_len_sq {
            v = closest.point;
            break;
        }
        v = closest.point;
    }

    if v.length_squared() <= TOUCH_EPSILON_SQ {
        return GjkOutcome::Intersecting { simplex };
    }

    let (point_a, point_b) = witnesses(&simplex.points, &closest.weights);
    GjkOutcome::Separated {
        distance: v.length(),
        point_a,
        point_b,
    }
}

fn witnesses(points: &[SupportPoint], weights: &[f64]) -> (DVec3, DVec3) {
    let mut a = DVec3::ZERO;
    let mut b = DVec3::ZERO;
    let total: f64 = weights.iter().sum();
    let scale = if total > 0.0 { 1.0 / total } else { 1.0 };
    for (p, w) in points.iter().zip(weights) {
        a += p.a * (w * scale);
        b += p.b * (w * scale);
    }
    (a, b)
}

/// Closest point of a simplex to the origin, as barycentric weights over its
/// vertices (zero weight = vertex not in the supporting feature).
#[derive(Debug, Clone)]
struct Closest {
    point: DVec3,
    weights: Vec<f64>,
}

/// `None` when the origin lies inside a tetrahedron.
fn closest_on_simplex(points: &[SupportPoint]) -> Option<Closest> {
    let p: Vec<DVec3> = points.iter().map(|s| s.point).collect();
    match p.len() {
        1 => Some(Closest {
            point: p[0],
            weights: vec![1.0],
        }),
        2 => {
            let (t, point) = closest_on_segment(p[0], p[1]);
            Some(Closest {
                point,
                weights: vec![1.0 - t, t],
            })
        }
        3 => {
            let (w, point) = closest_on_triangle(p[0], p[1], p[2]);
            Some(Closest {
                point,
                weights: w.to_vec(),
            })
        }
        _ => closest_on_tetrahedron(p[0], p[1], p[2], p[3]),
    }
}

/// Parameter `t` of the segment point closest to the origin.
pub(crate) fn closest_on_segment(a: DVec3, b: DVec3) -> (f64, DVec3) {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom <= f64::EPSILON {
        return (0.0, a);
    }
    let t = (-a.dot(ab) / denom).clamp(0.0, 1.0);
    (t, a + ab * t)
}

/// Barycentric weights of the triangle point closest to the origin
/// (Ericson, Real-Time Collision Detection, 5.1.5).
pub(crate) fn closest_on_triangle(a: DVec3, b: DVec3, c: DVec3) -> ([f64; 3], DVec3) {
    let ab = b - a;
    let ac = c - a;
    let ap = -a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ([1.0, 0.0, 0.0], a);
    }

    let bp = -b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return ([0.0, 1.0, 0.0], b);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return ([1.0 - v, v, 0.0], a + ab * v);
    }

    let cp = -c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return ([0.0, 0.0, 1.0], c);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return ([1.0 - w, 0.0, w], a + ac * w);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return ([0.0, 1.0 - w, w], b + (c - b) * w);
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::MIN_POSITIVE {
        // Degenerate (collinear) triangle: fall back to its longest edge.
        let (t, point) = closest_on_segment(a, b);
        return ([1.0 - t, t, 0.0], point);
    }
    let denom = 1.0 / sum;
    let v = vb * denom;
    let w = vc * denom;
    ([1.0 - v - w, v, w], a + ab * v + ac * w)
}

fn closest_on_tetrahedron(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> Option<Closest> {
    let volume = (b - a).dot((c - a).cross(d - a));
    let degenerate = volume.abs() <= 1e-14 * (b - a).length().max(1.0).powi(3);

    // Faces paired with the vertex opposite to them, as vertex indices.
    const FACES: [([usize; 3], usize); 4] = [
        ([0, 1, 2], 3),
        ([0, 1, 3], 2),
        ([0, 2, 3], 1),
        ([1, 2, 3], 0),
    ];
    let verts = [a, b, c, d];

    let mut best: Option<Closest> = None;
    let mut best_dist = f64::INFINITY;
    for (face, opposite) in FACES {
        let (p0, p1, p2) = (verts[face[0]], verts[face[1]], verts[face[2]]);
        if !degenerate && !origin_outside_face(p0, p1, p2, verts[opposite]) {
            continue;
        }
        let (w, point) = closest_on_triangle(p0, p1, p2);
        let dist = point.length_squared();
        if dist < best_dist {
            best_dist = dist;
            let mut weights = vec![0.0; 4];
            for (i, idx) in face.iter().enumerate() {
                weights[*idx] = w[i];
            }
            best = Some(Closest { point, weights });
        }
    }
    best
}

/// Whether the origin and `opposite` lie on different sides of plane `abc`.
fn origin_outside_face(a: DVec3, b: DVec3, c: DVec3, opposite: DVec3) -> bool {
    let n = (b - a).cross(c - a);
    let sign_origin = (-a).dot(n);
    let sign_opposite = (opposite - a).dot(n);
    sign_origin * sign_opposite < 0.0
}
