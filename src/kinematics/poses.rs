use crate::error::{Error, Result};
use crate::math::Transform;
use crate::model::{ChainId, KinematicChain};

/// World pose of every link of one chain, indexed like the chain's links.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSet {
    chain: ChainId,
    poses: Vec<Transform>,
}

impl PoseSet {
    pub(crate) fn new(chain: ChainId, poses: Vec<Transform>) -> Self {
        Self { chain, poses }
    }

    /// The chain these poses were resolved for.
    pub fn chain_id(&self) -> ChainId {
        self.chain
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, link: usize) -> Option<&Transform> {
        self.poses.get(link)
    }

    /// Pose of the link called `name` in `chain`.
    pub fn by_name(&self, chain: &KinematicChain, name: &str) -> Result<&Transform> {
        self.ensure_belongs_to(chain)?;
        chain
            .link_index(name)
            .and_then(|i| self.poses.get(i))
            .ok_or_else(|| Error::NotFound {
                path: format!("{}#{name}", chain.name()),
            })
    }

    /// Pose of link `to` expressed in the frame of link `from`.
    pub fn relative(&self, from: usize, to: usize) -> Option<Transform> {
        let from = self.poses.get(from)?;
        let to = self.poses.get(to)?;
        Some(from.inverse() * *to)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transform> + '_ {
        self.poses.iter()
    }

    pub fn as_slice(&self) -> &[Transform] {
        &self.poses
    }

    /// Seven floats per link, `[tx, ty, tz, qx, qy, qz, qw]`, in link order.
    pub fn to_flat(&self) -> Vec<f64> {
        self.poses.iter().flat_map(Transform::to_array).collect()
    }

    /// `PoseMismatch` unless these poses were resolved from `chain`.
    pub fn ensure_belongs_to(&self, chain: &KinematicChain) -> Result<()> {
        if self.chain != chain.id() || self.poses.len() != chain.link_count() {
            return Err(Error::PoseMismatch {
                chain: chain.name().to_string(),
            });
        }
        Ok(())
    }
}
