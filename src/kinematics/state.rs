use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::KinematicChain;

/// Joint values keyed by joint name: radians for revolute joints, length
/// units for prismatic ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointState {
    values: BTreeMap<String, f64>,
}

impl JointState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up `names[i]` with `values[i]`.
    pub fn from_pairs<S: AsRef<str>>(names: &[S], values: &[f64]) -> Result<Self> {
        if names.len() != values.len() {
            return Err(Error::boundary(format!(
                "{} joint names but {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(names
            .iter()
            .zip(values)
            .map(|(n, v)| (n.as_ref().to_string(), *v))
            .collect())
    }

    /// One value per degree of freedom, in the chain's DOF order.
    pub fn from_dofs(chain: &KinematicChain, values: &[f64]) -> Result<Self> {
        if values.len() != chain.dof_count() {
            return Err(Error::boundary(format!(
                "chain '{}' has {} degrees of freedom, got {} values",
                chain.name(),
                chain.dof_count(),
                values.len()
            )));
        }
        Ok(chain
            .dof_names()
            .zip(values)
            .map(|(n, v)| (n.to_string(), *v))
            .collect())
    }

    /// Every non-fixed joint at zero.
    pub fn zeros(chain: &KinematicChain) -> Self {
        chain.dof_names().map(|n| (n.to_string(), 0.0)).collect()
    }

    pub fn with(mut self, joint: impl Into<String>, value: f64) -> Self {
        self.set(joint, value);
        self
    }

    pub fn set(&mut self, joint: impl Into<String>, value: f64) {
        self.values.insert(joint.into(), value);
    }

    pub fn get(&self, joint: &str) -> Option<f64> {
        self.values.get(joint).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for JointState {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
