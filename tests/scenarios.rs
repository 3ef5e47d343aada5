//! End-to-end scenarios: description file in the VFS, through the loader and
//! the solver, out through proximity.

use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use glam::{DQuat, DVec3};
use kinprox::model::JointSpecKind;
use kinprox::{
    ChainBuilder, ChainLoader, Error, JointSpec, JointState, KinematicsSolver, Link,
    ProximityEngine, Transform, VirtualFs,
};

const ARM: &str = r#"{
    "name": "arm",
    "links": [
        { "name": "link0" },
        { "name": "link1", "offset": { "xyz": [1, 0, 0] } }
    ],
    "joints": [
        { "name": "joint0", "type": "revolute", "parent": "link0", "child": "link1",
          "axis": [0, 0, 1], "limits": { "lower": -3.14159, "upper": 3.14159 } }
    ]
}"#;

fn sphere_at(name: &str, x: f64) -> String {
    format!(
        r#"{{ "name": "{name}", "base": {{ "xyz": [{x}, 0, 0] }},
             "links": [ {{ "name": "ball",
                           "collision": [ {{ "shape": {{ "type": "sphere", "radius": 0.5 }} }} ] }} ] }}"#
    )
}

#[test]
fn test_quarter_turn_moves_link_onto_y() {
    let vfs = VirtualFs::new();
    vfs.inject("arm.json", ARM.as_bytes().to_vec());
    let chain = ChainLoader::new(&vfs).load("arm.json").unwrap();

    let poses = KinematicsSolver::default()
        .resolve(&chain, &JointState::new().with("joint0", FRAC_PI_2))
        .unwrap();

    let link1 = poses.by_name(&chain, "link1").unwrap();
    assert!(link1.position.abs_diff_eq(DVec3::new(0.0, 1.0, 0.0), 1e-9));
    let expected = Transform::from_position_rotation(
        DVec3::Y,
        DQuat::from_axis_angle(DVec3::Z, FRAC_PI_2),
    );
    assert!(link1.abs_diff_eq(&expected, 1e-9));
    assert!(poses
        .by_name(&chain, "link0")
        .unwrap()
        .abs_diff_eq(&Transform::IDENTITY, 1e-12));
}

#[test]
fn test_zero_state_places_links_at_their_offsets() {
    let vfs = VirtualFs::new();
    vfs.inject("arm.json", ARM.as_bytes().to_vec());
    let chain = ChainLoader::new(&vfs).load("arm.json").unwrap();
    let poses = KinematicsSolver::default()
        .resolve(&chain, &JointState::zeros(&chain))
        .unwrap();
    assert!(poses.get(1).unwrap().position.abs_diff_eq(DVec3::X, 1e-12));
    assert_relative_eq!(poses.get(1).unwrap().rotation.w.abs(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_zero_state_with_identity_frames_puts_every_link_at_the_base() {
    let base = Transform::from_xyz_rpy([0.4, -1.2, 0.7], [0.3, -0.6, 2.1]);
    let chain = ChainBuilder::new("tree")
        .base(base)
        .add_link(Link::new("root"))
        .add_link(Link::new("upper"))
        .add_link(Link::new("slider"))
        .add_link(Link::new("tool"))
        .add_link(Link::new("spinner"))
        .add_joint(
            JointSpec::revolute("shoulder", "root", "upper", DVec3::Z).with_limits(-1.0, 1.0),
        )
        .add_joint(JointSpec::prismatic(
            "rail",
            "upper",
            "slider",
            DVec3::new(1.0, 1.0, 0.0),
        ))
        .add_joint(JointSpec::fixed("mount", "slider", "tool"))
        .add_joint(
            JointSpec::new("wheel", JointSpecKind::Continuous, "root", "spinner")
                .with_axis(DVec3::Y),
        )
        .build()
        .unwrap();

    let poses = KinematicsSolver::default()
        .resolve(&chain, &JointState::zeros(&chain))
        .unwrap();

    assert_eq!(poses.len(), 5);
    for (name, pose) in chain.link_names().zip(poses.iter()) {
        assert!(
            pose.abs_diff_eq(&chain.base(), 1e-12),
            "link '{name}' at {pose:?}, base {:?}",
            chain.base()
        );
    }
}

#[test]
fn test_resolution_is_deterministic() {
    let vfs = VirtualFs::new();
    vfs.inject("arm.json", ARM.as_bytes().to_vec());
    let chain = ChainLoader::new(&vfs).load("arm.json").unwrap();
    let solver = KinematicsSolver::default();
    let state = JointState::new().with("joint0", 0.7345);
    let first = solver.resolve(&chain, &state).unwrap();
    let second = solver.resolve(&chain, &state).unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(a.abs_diff_eq(b, 1e-9));
    }
    assert_eq!(first, second);
}

#[test]
fn test_two_spheres_apart_and_overlapping() {
    let vfs = VirtualFs::new();
    vfs.inject("a.json", sphere_at("a", 0.0).into_bytes());
    vfs.inject("far.json", sphere_at("far", 3.0).into_bytes());
    vfs.inject("near.json", sphere_at("near", 0.8).into_bytes());

    let loader = ChainLoader::new(&vfs);
    let a = loader.load("a.json").unwrap();
    let far = loader.load("far.json").unwrap();
    let near = loader.load("near.json").unwrap();

    let solver = KinematicsSolver::default();
    let empty = JointState::new();
    let pa = solver.resolve(&a, &empty).unwrap();
    let pfar = solver.resolve(&far, &empty).unwrap();
    let pnear = solver.resolve(&near, &empty).unwrap();

    let engine = ProximityEngine::default();
    let apart = engine.check_pair(&a, &pa, &far, &pfar).unwrap();
    assert_eq!(apart.len(), 1);
    assert_relative_eq!(apart[0].distance, 2.0, epsilon = 1e-12);
    assert!(!apart[0].colliding);

    let overlapping = engine.check_pair(&a, &pa, &near, &pnear).unwrap();
    assert_relative_eq!(overlapping[0].distance, -0.2, epsilon = 1e-12);
    assert!(overlapping[0].colliding);

    assert!(engine.in_collision(&[(&a, &pa), (&near, &pnear)]).unwrap());
    assert!(!engine.in_collision(&[(&a, &pa), (&far, &pfar)]).unwrap());
}

#[test]
fn test_disconnected_link_is_rejected() {
    let text = r#"{ "links": [ { "name": "a" }, { "name": "b" }, { "name": "loose" } ],
                    "joints": [ { "name": "j", "type": "fixed", "parent": "a", "child": "b" } ] }"#;
    let vfs = VirtualFs::new();
    vfs.inject("bad.json", text.as_bytes().to_vec());
    let err = ChainLoader::new(&vfs).load("bad.json").unwrap_err();
    assert!(matches!(err, Error::Structural { .. }), "{err}");
}

#[test]
fn test_joint_to_missing_link_is_rejected() {
    let text = r#"{ "links": [ { "name": "a" } ],
                    "joints": [ { "name": "j", "type": "revolute", "parent": "a", "child": "ghost",
                                  "axis": [0, 0, 1] } ] }"#;
    let vfs = VirtualFs::new();
    vfs.inject("bad.json", text.as_bytes().to_vec());
    let err = ChainLoader::new(&vfs).load("bad.json").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "{err}");
}

#[test]
fn test_zero_axis_is_rejected() {
    let text = r#"{ "links": [ { "name": "a" }, { "name": "b" } ],
                    "joints": [ { "name": "spin", "type": "continuous", "parent": "a", "child": "b",
                                  "axis": [0, 0, 0] } ] }"#;
    let vfs = VirtualFs::new();
    vfs.inject("bad.json", text.as_bytes().to_vec());
    let err = ChainLoader::new(&vfs).load("bad.json").unwrap_err();
    assert_eq!(
        err,
        Error::InvalidAxis {
            joint: "spin".into()
        }
    );
}

#[test]
fn test_reinjected_file_is_picked_up() {
    let vfs = VirtualFs::new();
    vfs.inject("ball.json", sphere_at("first", 0.0).into_bytes());
    let held = vfs.read("ball.json").unwrap();
    vfs.inject("ball.json", sphere_at("second", 0.0).into_bytes());

    let chain = ChainLoader::new(&vfs).load("ball.json").unwrap();
    assert_eq!(chain.name(), "second");
    // Readers that already hold the old content keep it.
    assert!(std::str::from_utf8(&held).unwrap().contains("first"));
}
