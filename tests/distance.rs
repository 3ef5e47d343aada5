//! Distance properties across every shape pairing.

use approx::assert_relative_eq;
use glam::DVec3;
use kinprox::proximity::{shape_distance, GjkSettings};
use kinprox::{Shape, Transform};

fn shapes() -> Vec<Shape> {
    vec![
        Shape::sphere(0.4),
        Shape::capsule(0.2, 0.5),
        Shape::cuboid(DVec3::new(0.3, 0.4, 0.5)),
        Shape::cylinder(0.35, 0.45),
        Shape::convex_hull(vec![
            DVec3::new(-0.4, -0.3, -0.2),
            DVec3::new(0.5, -0.3, -0.2),
            DVec3::new(0.0, 0.6, -0.2),
            DVec3::new(0.0, 0.0, 0.7),
        ]),
    ]
}

fn poses() -> Vec<(Transform, Transform)> {
    vec![
        // Well apart.
        (
            Transform::from_xyz_rpy([0.0, 0.0, 0.0], [0.1, 0.2, 0.3]),
            Transform::from_xyz_rpy([2.5, 0.4, -0.3], [0.7, -0.2, 1.1]),
        ),
        // Close.
        (
            Transform::from_xyz_rpy([0.1, -0.2, 0.0], [0.0, 0.0, 0.0]),
            Transform::from_xyz_rpy([1.2, 0.3, 0.2], [0.3, 0.9, -0.4]),
        ),
        // Overlapping.
        (
            Transform::from_xyz_rpy([0.0, 0.0, 0.0], [0.0, 0.4, 0.0]),
            Transform::from_xyz_rpy([0.3, 0.1, 0.1], [1.0, 0.0, 0.5]),
        ),
    ]
}

#[test]
fn test_distance_is_symmetric_for_all_pairings() {
    let settings = GjkSettings::default();
    for a in &shapes() {
        for b in &shapes() {
            for (pa, pb) in poses() {
                let ab = shape_distance(&pa, a, &pb, b, &settings).unwrap();
                let ba = shape_distance(&pb, b, &pa, a, &settings).unwrap();
                assert!(
                    (ab.distance - ba.distance).abs() <= 1e-9,
                    "{:?} vs {:?}: {} != {}",
                    a.kind(),
                    b.kind(),
                    ab.distance,
                    ba.distance
                );
                assert_eq!(ab.colliding, ba.colliding);
                assert!(ab.point_a.abs_diff_eq(ba.point_b, 1e-9));
            }
        }
    }
}

#[test]
fn test_colliding_matches_sign() {
    let settings = GjkSettings::default();
    for a in &shapes() {
        for b in &shapes() {
            for (pa, pb) in poses() {
                let s = shape_distance(&pa, a, &pb, b, &settings).unwrap();
                assert_eq!(s.colliding, s.distance <= 0.0);
                assert!(s.distance.is_finite());
            }
        }
    }
}

#[test]
fn test_far_pairs_separate_and_overlapping_pairs_collide() {
    let settings = GjkSettings::default();
    let far = (
        Transform::IDENTITY,
        Transform::from_position(DVec3::new(5.0, 0.0, 0.0)),
    );
    let same = (Transform::IDENTITY, Transform::IDENTITY);
    for a in &shapes() {
        for b in &shapes() {
            let s = shape_distance(&far.0, a, &far.1, b, &settings).unwrap();
            assert!(!s.colliding, "{:?}/{:?} at 5 apart", a.kind(), b.kind());
            assert!(s.distance > 3.0);

            let s = shape_distance(&same.0, a, &same.1, b, &settings).unwrap();
            assert!(s.colliding, "{:?}/{:?} concentric", a.kind(), b.kind());
        }
    }
}

#[test]
fn test_sphere_distance_is_monotone_and_flips_at_contact() {
    let settings = GjkSettings::default();
    let ball = Shape::sphere(0.5);
    let mut previous = f64::NEG_INFINITY;
    for step in 0..=40 {
        let x = 0.5 + step as f64 * 0.05;
        let s = shape_distance(
            &Transform::IDENTITY,
            &ball,
            &Transform::from_position(DVec3::new(x, 0.0, 0.0)),
            &ball,
            &settings,
        )
        .unwrap();
        assert!(s.distance > previous);
        assert_relative_eq!(s.distance, x - 1.0, epsilon = 1e-12);
        assert_eq!(s.colliding, s.distance <= 0.0);
        previous = s.distance;
    }

    let touching = shape_distance(
        &Transform::IDENTITY,
        &ball,
        &Transform::from_position(DVec3::X),
        &ball,
        &settings,
    )
    .unwrap();
    assert_eq!(touching.distance, 0.0);
    assert!(touching.colliding);
}

#[test]
fn test_gjk_agrees_with_analytic_box_distance() {
    let settings = GjkSettings::default();
    let cube = Shape::cuboid(DVec3::splat(0.5));
    let ball = Shape::sphere(0.25);
    // Ball beyond a corner of the cube.
    let corner = DVec3::splat(0.5);
    let centre = corner + DVec3::new(1.0, 2.0, 2.0) / 3.0 * 1.5;
    let s = shape_distance(
        &Transform::from_position(centre),
        &ball,
        &Transform::IDENTITY,
        &cube,
        &settings,
    )
    .unwrap();
    assert_relative_eq!(s.distance, 1.25, epsilon = 1e-6);
    assert!(s.point_b.abs_diff_eq(corner, 1e-6));
}

#[test]
fn test_cylinder_side_distance() {
    let settings = GjkSettings::default();
    let cylinder = Shape::cylinder(0.5, 1.0);
    let cube = Shape::cuboid(DVec3::splat(0.25));
    let s = shape_distance(
        &Transform::IDENTITY,
        &cylinder,
        &Transform::from_position(DVec3::new(0.0, 2.0, 0.3)),
        &cube,
        &settings,
    )
    .unwrap();
    assert_relative_eq!(s.distance, 1.25, epsilon = 1e-6);
}

#[test]
fn test_same_kind_same_pose_is_symmetric() {
    let settings = GjkSettings::default();
    let pairs = [
        (Shape::cylinder(0.0, 0.5), Shape::cylinder(0.5, 0.0)),
        (Shape::cylinder(0.35, 0.45), Shape::cylinder(0.2, 0.9)),
        (Shape::sphere(0.3), Shape::sphere(0.6)),
        (Shape::capsule(0.1, 0.5), Shape::capsule(0.3, 0.2)),
        (
            Shape::cuboid(DVec3::new(0.3, 0.4, 0.5)),
            Shape::cuboid(DVec3::new(0.5, 0.1, 0.2)),
        ),
        (
            Shape::convex_hull(vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z]),
            Shape::convex_hull(vec![DVec3::ZERO, DVec3::X, DVec3::Y]),
        ),
    ];
    for pose in [
        Transform::IDENTITY,
        Transform::from_xyz_rpy([0.2, -0.1, 0.4], [0.3, -0.5, 1.2]),
    ] {
        for (a, b) in &pairs {
            let ab = shape_distance(&pose, a, &pose, b, &settings).unwrap();
            let ba = shape_distance(&pose, b, &pose, a, &settings).unwrap();
            assert_eq!(ab.distance, ba.distance, "{a:?} / {b:?}");
            assert_eq!(ab.colliding, ba.colliding);
            assert_eq!(ab.point_a, ba.point_b);
            assert_eq!(ab.point_b, ba.point_a);
        }
    }
}
