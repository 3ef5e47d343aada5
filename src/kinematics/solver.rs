use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::poses::PoseSet;
use super::state::JointState;
use crate::error::{Error, Result};
use crate::math::Transform;
use crate::model::{Joint, KinematicChain};

/// What to do with a joint value outside its limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Clamp into range and log a warning.
    #[default]
    Clamp,
    /// Fail with `OutOfLimits`.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    pub limit_policy: LimitPolicy,
}

impl KinematicsConfig {
    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }
}

/// Forward kinematics: joint values to world link poses.
#[derive(Debug, Clone, Default)]
pub struct KinematicsSolver {
    config: KinematicsConfig,
}

impl KinematicsSolver {
    pub fn new(config: KinematicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KinematicsConfig {
        &self.config
    }

    /// World pose of every link.
    ///
    /// The root sits at the chain base; every other link is placed at
    /// `parent * joint.origin * motion(q) * link.offset`, walking the links
    /// parent-first.
    pub fn resolve(&self, chain: &KinematicChain, state: &JointState) -> Result<PoseSet> {
        for (name, _) in state.iter() {
            if chain.joint_index(name).is_none() {
                debug!("ignoring value for unknown joint '{}' on '{}'", name, chain.name());
            }
        }

        let links = chain.links();
        let joints = chain.joints();
        let mut world = vec![Transform::IDENTITY; links.len()];
        world[chain.root()] = chain.base();

        for &link_index in chain.topological_order() {
            let link = &links[link_index];
            let Some(joint_index) = link.parent_joint() else {
                continue;
            };
            let joint = &joints[joint_index];
            let q = self.joint_value(joint, state)?;
            world[link_index] =
                world[joint.parent] * joint.origin * joint.kind.motion(q) * link.offset;
        }

        Ok(PoseSet::new(chain.id(), world))
    }

    /// [`resolve`](Self::resolve) with one value per DOF, in DOF order.
    pub fn resolve_dofs(&self, chain: &KinematicChain, values: &[f64]) -> Result<PoseSet> {
        self.resolve(chain, &JointState::from_dofs(chain, values)?)
    }

    fn joint_value(&self, joint: &Joint, state: &JointState) -> Result<f64> {
        if joint.is_fixed() {
            return Ok(0.0);
        }
        let value = state.get(&joint.name).ok_or_else(|| Error::MissingJoint {
            joint: joint.name.clone(),
        })?;
        if !value.is_finite() {
            return Err(Error::boundary(format!(
                "joint '{}' value is not finite: {value}",
                joint.name
            )));
        }

        let Some(limits) = joint.kind.limits() else {
            return Ok(value);
        };
        if limits.contains(value) {
            return Ok(value);
        }
        match self.config.limit_policy {
            LimitPolicy::Clamp => {
                let clamped = limits.clamp(value);
                warn!(
                    "joint '{}' value {} outside [{}, {}], clamped to {}",
                    joint.name, value, limits.lower, limits.upper, clamped
                );
                Ok(clamped)
            }
            LimitPolicy::Reject => Err(Error::OutOfLimits {
                joint: joint.name.clone(),
                value,
            }),
        }
    }
}
