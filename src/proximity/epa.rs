//! EPA (Expanding Polytope Algorithm) penetration depth.
//!
//! Starts from a GJK simplex enclosing the origin and grows a polytope inside
//! the Minkowski difference `A - B` until the face nearest to the origin is on
//! the boundary. That face gives the penetration depth and direction.

use glam::DVec3;
use log::trace;

use super::gjk::{closest_on_triangle, minkowski_support, GjkSettings, Simplex, SupportPoint};
use super::shape::ConvexBody;

/// Minimum separation for a point to count as new when building the
/// initial tetrahedron.
const RANK_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct Penetration {
    /// Overlap depth, positive.
    pub depth: f64,
    /// Deepest point of A inside B.
    pub point_a: DVec3,
    /// Deepest point of B inside A.
    pub point_b: DVec3,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    vertices: [usize; 3],
    normal: DVec3,
    distance: f64,
}

/// `None` if the bodies are too degenerate (flat or empty overlap) to build
/// a polytope.
pub fn epa(
    a: &ConvexBody,
    b: &ConvexBody,
    simplex: &Simplex,
    settings: &GjkSettings,
) -> Option<Penetration> {
    let mut vertices = expand_to_tetrahedron(a, b, simplex.points())?;
    let interior = vertices.iter().map(|v| v.point).sum::<DVec3>() / vertices.len() as f64;

    let mut faces: Vec<Face> = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]]
        .into_iter()
        .filter_map(|f| make_face(&vertices, f, interior))
        .collect();

    for iteration in 0..settings.epa_max_iterations {
        let closest = *closest_face(&faces)?;
        let w = minkowski_support(a, b, closest.normal);
        let reach = w.point.dot(closest.normal);

        if reach - closest.distance <= settings.epa_tolerance {
            trace!("epa converged after {} iterations", iteration);
            return Some(penetration_from_face(&vertices, &closest));
        }

        let new_index = vertices.len();
        vertices.push(w);

        let mut horizon: Vec<(usize, usize)> = Vec::new();
        let before = faces.len();
        faces.retain(|face| {
            let visible = face.normal.dot(w.point - vertices[face.vertices[0]].point) > 0.0;
            if visible {
                let [i, j, k] = face.vertices;
                add_edge(&mut horizon, i, j);
                add_edge(&mut horizon, j, k);
                add_edge(&mut horizon, k, i);
            }
            !visible
        });

        if faces.len() == before {
            // No face can see the new point: the polytope cannot grow further.
            return Some(penetration_from_face(&vertices, &closest));
        }

        for (i, j) in horizon {
            if let Some(face) = make_face(&vertices, [i, j, new_index], interior) {
                faces.push(face);
            }
        }
    }

    let closest = closest_face(&faces)?;
    Some(penetration_from_face(&vertices, closest))
}

fn penetration_from_face(vertices: &[SupportPoint], face: &Face) -> Penetration {
    let projected = face.normal * face.distance;
    let [i, j, k] = face.vertices;
    let (w, _) = closest_on_triangle(
        vertices[i].point - projected,
        vertices[j].point - projected,
        vertices[k].point - projected,
    );
    let point_a = vertices[i].a * w[0] + vertices[j].a * w[1] + vertices[k].a * w[2];
    let point_b = vertices[i].b * w[0] + vertices[j].b * w[1] + vertices[k].b * w[2];
    Penetration {
        depth: face.distance.max(0.0),
        point_a,
        point_b,
    }
}

fn closest_face(faces: &[Face]) -> Option<&Face> {
    faces
        .iter()
        .min_by(|x, y| x.distance.abs().total_cmp(&y.distance.abs()))
}

/// Outward-facing triangle, oriented away from `interior`.
fn make_face(vertices: &[SupportPoint], indices: [usize; 3], interior: DVec3) -> Option<Face> {
    let [i, j, k] = indices;
    let a = vertices[i].point;
    let n = (vertices[j].point - a).cross(vertices[k].point - a);
    let len = n.length();
    if len <= f64::EPSILON {
        return None;
    }
    let mut normal = n / len;
    let mut ordered = indices;
    if normal.dot(a - interior) < 0.0 {
        normal = -normal;
        ordered = [i, k, j];
    }
    Some(Face {
        vertices: ordered,
        normal,
        distance: normal.dot(a),
    })
}

/// Record an edge of a removed face; an edge shared by two removed faces is
/// interior to the hole and cancels out.
fn add_edge(edges: &mut Vec<(usize, usize)>, from: usize, to: usize) {
    if let Some(pos) = edges
        .iter()
        .position(|&(a, b)| (a == to && b == from) || (a == from && b == to))
    {
        edges.swap_remove(pos);
    } else {
        edges.push((from, to));
    }
}

/// Grow a 1-3 point simplex into a non-degenerate tetrahedron.
fn expand_to_tetrahedron(
    a: &ConvexBody,
    b: &ConvexBody,
    seed: &[SupportPoint],
) -> Option<Vec<SupportPoint>> {
    let mut vertices: Vec<SupportPoint> = Vec::with_capacity(4);
    for p in seed {
        if raises_rank(&vertices, p.point) {
            vertices.push(*p);
        }
    }
    if vertices.is_empty() {
        vertices.push(minkowski_support(a, b, DVec3::X));
    }

    while vertices.len() < 4 {
        let found = search_directions(&vertices)
            .into_iter()
            .map(|d| minkowski_support(a, b, d))
            .find(|s| raises_rank(&vertices, s.point))?;
        vertices.push(found);
    }
    Some(vertices)
}

fn search_directions(vertices: &[SupportPoint]) -> Vec<DVec3> {
    let axes = [DVec3::X, DVec3::Y, DVec3::Z];
    match vertices.len() {
        1 => axes.iter().flat_map(|d| [*d, -*d]).collect(),
        2 => {
            let edge = vertices[1].point - vertices[0].point;
            let least_aligned = axes
                .iter()
                .copied()
                .min_by(|x, y| x.dot(edge).abs().total_cmp(&y.dot(edge).abs()))
                .unwrap_or(DVec3::X);
            let p1 = edge.cross(least_aligned);
            let p2 = edge.cross(p1);
            vec![p1, -p1, p2, -p2]
        }
        _ => {
            let n = (vertices[1].point - vertices[0].point)
                .cross(vertices[2].point - vertices[0].point);
            vec![n, -n]
        }
    }
}

/// Whether `p` lies off the affine hull of `vertices`.
fn raises_rank(vertices: &[SupportPoint], p: DVec3) -> bool {
    match vertices.len() {
        0 => true,
        1 => vertices[0].point.distance(p) > RANK_EPSILON,
        2 => {
            let a = vertices[0].point;
            let dir = vertices[1].point - a;
            let len = dir.length();
            len > 0.0 && dir.cross(p - a).length() / len > RANK_EPSILON
        }
        3 => {
            let a = vertices[0].point;
            let n = (vertices[1].point - a).cross(vertices[2].point - a);
            let len = n.length();
            len > 0.0 && (n.dot(p - a) / len).abs() > RANK_EPSILON
        }
        _ => false,
    }
}
