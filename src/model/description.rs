//! JSON chain descriptions.

use glam::{DQuat, DVec3};
use serde::Deserialize;

use super::chain::{ChainBuilder, JointSpec, JointSpecKind, KinematicChain};
use super::link::{Collider, Link};
use crate::error::{Error, Result};
use crate::math::Transform;
use crate::proximity::Shape;

/// A frame given as URDF-style `xyz` + `rpy`, or `xyz` + `quat` (`[x, y, z, w]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginDescription {
    #[serde(default)]
    pub xyz: [f64; 3],
    #[serde(default)]
    pub rpy: Option<[f64; 3]>,
    #[serde(default)]
    pub quat: Option<[f64; 4]>,
}

impl OriginDescription {
    pub fn to_transform(&self, owner: &str) -> Result<Transform> {
        match (self.rpy, self.quat) {
            (Some(_), Some(_)) => Err(Error::parse(format!(
                "{owner}: origin gives both 'rpy' and 'quat'"
            ))),
            (_, Some([x, y, z, w])) => {
                let q = DQuat::from_xyzw(x, y, z, w);
                let len = q.length();
                if !len.is_finite() || len <= f64::EPSILON {
                    return Err(Error::parse(format!(
                        "{owner}: origin quaternion has no direction"
                    )));
                }
                Ok(Transform::from_position_rotation(
                    DVec3::from_array(self.xyz),
                    q / len,
                ))
            }
            (rpy, None) => Ok(Transform::from_xyz_rpy(self.xyz, rpy.unwrap_or_default())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColliderDescription {
    pub shape: Shape,
    #[serde(default)]
    pub origin: OriginDescription,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkDescription {
    pub name: String,
    #[serde(default)]
    pub offset: OriginDescription,
    #[serde(default)]
    pub collision: Vec<ColliderDescription>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
}

impl From<JointType> for JointSpecKind {
    fn from(value: JointType) -> Self {
        match value {
            JointType::Revolute => JointSpecKind::Revolute,
            JointType::Continuous => JointSpecKind::Continuous,
            JointType::Prismatic => JointSpecKind::Prismatic,
            JointType::Fixed => JointSpecKind::Fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsDescription {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JointDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub origin: OriginDescription,
    #[serde(default)]
    pub axis: Option<[f64; 3]>,
    #[serde(default)]
    pub limits: Option<LimitsDescription>,
}

/// Top-level JSON document describing one chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainDescription {
    #[serde(default = "default_chain_name")]
    pub name: String,
    #[serde(default)]
    pub base: OriginDescription,
    pub links: Vec<LinkDescription>,
    #[serde(default)]
    pub joints: Vec<JointDescription>,
    #[serde(default)]
    pub skip_pairs: Vec<[String; 2]>,
}

fn default_chain_name() -> String {
    "chain".to_string()
}

impl ChainDescription {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::parse(format!("invalid chain JSON: {e}")))
    }

    pub fn into_builder(self) -> Result<ChainBuilder> {
        let base = self.base.to_transform("base")?;
        let mut builder = ChainBuilder::new(self.name).base(base);

        for link in self.links {
            let offset = link.offset.to_transform(&format!("link '{}'", link.name))?;
            let mut built = Link::new(link.name.as_str()).with_offset(offset);
            for collider in link.collision {
                let origin = collider
                    .origin
                    .to_transform(&format!("collider of link '{}'", link.name))?;
                built = built.with_collider(Collider::new(collider.shape).with_origin(origin));
            }
            builder = builder.add_link(built);
        }

        for joint in self.joints {
            let origin = joint.origin.to_transform(&format!("joint '{}'", joint.name))?;
            let mut spec = JointSpec::new(
                joint.name,
                joint.joint_type.into(),
                joint.parent,
                joint.child,
            )
            .with_origin(origin);
            if let Some(axis) = joint.axis {
                spec = spec.with_axis(DVec3::from_array(axis));
            }
            if let Some(limits) = joint.limits {
                spec = spec.with_limits(limits.lower, limits.upper);
            }
            builder = builder.add_joint(spec);
        }

        for [a, b] in self.skip_pairs {
            builder = builder.skip_pair(a, b);
        }
        Ok(builder)
    }
}

/// Parse and validate a JSON chain description.
pub fn parse_json(text: &str) -> Result<KinematicChain> {
    ChainDescription::from_json(text)?.into_builder()?.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JointKind;

    const ARM: &str = r#"{
        "name": "arm",
        "base": { "xyz": [0, 0, 0.1] },
        "links": [
            { "name": "link0",
              "collision": [ { "shape": { "type": "sphere", "radius": 0.5 } } ] },
            { "name": "link1", "offset": { "xyz": [1, 0, 0] },
              "collision": [ { "shape": { "type": "cuboid", "half_extents": [0.1, 0.2, 0.3] },
                               "origin": { "xyz": [0.5, 0, 0], "rpy": [0, 0, 1.5707963267948966] } } ] }
        ],
        "joints": [
            { "name": "joint0", "type": "revolute", "parent": "link0", "child": "link1",
              "axis": [0, 0, 1], "limits": { "lower": -3.14, "upper": 3.14 } }
        ],
        "skip_pairs": [["link0", "link1"]]
    }"#;

    #[test]
    fn test_parse_arm() {
        let chain = parse_json(ARM).unwrap();
        assert_eq!(chain.name(), "arm");
        assert_eq!(chain.link_count(), 2);
        assert!(chain.base().position.abs_diff_eq(DVec3::new(0.0, 0.0, 0.1), 1e-12));
        assert!(chain.links()[1]
            .offset
            .position
            .abs_diff_eq(DVec3::X, 1e-12));
        match chain.joints()[0].kind {
            JointKind::Revolute { axis, limits } => {
                assert_eq!(axis, DVec3::Z);
                assert_eq!(limits.map(|l| l.upper), Some(3.14));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(chain.is_skipped(0, 1));
    }

    #[test]
    fn test_quat_origin() {
        let origin = OriginDescription {
            xyz: [1.0, 2.0, 3.0],
            rpy: None,
            quat: Some([0.0, 0.0, 2.0, 0.0]),
        };
        let t = origin.to_transform("test").unwrap();
        assert!(t.rotation.is_normalized());

        let both = OriginDescription {
            rpy: Some([0.0; 3]),
            ..origin
        };
        assert!(both.to_transform("test").is_err());
    }

    #[test]
    fn test_unknown_joint_type() {
        let text = r#"{ "links": [ { "name": "a" }, { "name": "b" } ],
                        "joints": [ { "name": "j", "type": "floating", "parent": "a", "child": "b" } ] }"#;
        assert!(matches!(parse_json(text), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_json("{ not json"), Err(Error::Parse { .. })));
        assert!(matches!(
            parse_json(
                r#"{ "links": [ { "name": "a", "collision": [ { "shape": { "type": "mesh" } } ] } ] }"#
            ),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_continuous_joint_has_no_limits() {
        let text = r#"{ "links": [ { "name": "a" }, { "name": "b" } ],
                        "joints": [ { "name": "j", "type": "continuous", "parent": "a", "child": "b",
                                      "axis": [0, 1, 0] } ] }"#;
        let chain = parse_json(text).unwrap();
        assert_eq!(chain.name(), "chain");
        assert!(chain.joints()[0].kind.limits().is_none());
    }
}
