use std::ops::ControlFlow;

use glam::DVec3;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::gjk::GjkSettings;
use super::query::{shape_distance, Separation};
use crate::error::Result;
use crate::kinematics::PoseSet;
use crate::math::Transform;
use crate::model::{ChainId, KinematicChain, Link};

/// Whether links joined by a joint are checked against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyPolicy {
    #[default]
    ExcludeAdjacent,
    IncludeAdjacent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub adjacency: AdjacencyPolicy,
    /// Link pairs whose bounding spheres are further apart than this are not
    /// reported. `None` reports every pair.
    pub cutoff: Option<f64>,
    pub gjk: GjkSettings,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            adjacency: AdjacencyPolicy::ExcludeAdjacent,
            cutoff: None,
            gjk: GjkSettings::default(),
        }
    }
}

impl ProximityConfig {
    pub fn with_adjacency(mut self, adjacency: AdjacencyPolicy) -> Self {
        self.adjacency = adjacency;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_gjk(mut self, gjk: GjkSettings) -> Self {
        self.gjk = gjk;
        self
    }
}

/// A link of a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkRef {
    pub chain: ChainId,
    pub link: usize,
    pub name: String,
}

/// Minimum distance between the geometry of two links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityResult {
    pub link_a: LinkRef,
    pub link_b: LinkRef,
    /// Signed: negative is penetration depth.
    pub distance: f64,
    pub colliding: bool,
    pub point_a: DVec3,
    pub point_b: DVec3,
}

/// A chain paired with poses resolved from it.
pub type PosedChain<'a> = (&'a KinematicChain, &'a PoseSet);

#[derive(Debug, Clone, Copy)]
struct Candidate {
    entry_a: usize,
    link_a: usize,
    entry_b: usize,
    link_b: usize,
}

/// Distance and collision queries between link geometries of resolved chains.
#[derive(Debug, Clone, Default)]
pub struct ProximityEngine {
    config: ProximityConfig,
}

impl ProximityEngine {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Every unordered link pair of one chain, except adjacent pairs (unless
    /// the adjacency policy includes them) and the chain's skip pairs.
    pub fn check_chain(
        &self,
        chain: &KinematicChain,
        poses: &PoseSet,
    ) -> Result<Vec<ProximityResult>> {
        self.collect(&[(chain, poses)], false)
    }

    /// Every pair with one link from `a` and one from `b`.
    pub fn check_pair(
        &self,
        a: &KinematicChain,
        poses_a: &PoseSet,
        b: &KinematicChain,
        poses_b: &PoseSet,
    ) -> Result<Vec<ProximityResult>> {
        let entries = [(a, poses_a), (b, poses_b)];
        validate(&entries)?;
        let mut results = Vec::new();
        self.visit(&entries, cross_pairs(&entries, 0, 1), self.config.cutoff, |r| {
            results.push(r);
            ControlFlow::Continue(())
        })?;
        Ok(results)
    }

    /// Pairs within each chain, then across every pair of chains.
    pub fn check_chains(&self, chains: &[PosedChain<'_>]) -> Result<Vec<ProximityResult>> {
        self.collect(chains, true)
    }

    /// Whether any checked pair collides; stops at the first one found.
    pub fn in_collision(&self, chains: &[PosedChain<'_>]) -> Result<bool> {
        validate(chains)?;
        let mut hit = false;
        // Pairs whose bounding spheres are apart cannot collide.
        self.visit(chains, all_pairs(chains, self.config.adjacency), Some(0.0), |r| {
            if r.colliding {
                debug!(
                    "collision between '{}' and '{}' ({:.6})",
                    r.link_a.name, r.link_b.name, r.distance
                );
                hit = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(hit)
    }

    /// The closest checked pair, if any pair has geometry on both sides.
    pub fn min_distance(&self, chains: &[PosedChain<'_>]) -> Result<Option<ProximityResult>> {
        Ok(self
            .check_chains(chains)?
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance)))
    }

    fn collect(&self, chains: &[PosedChain<'_>], cross: bool) -> Result<Vec<ProximityResult>> {
        validate(chains)?;
        let candidates = if cross {
            all_pairs(chains, self.config.adjacency)
        } else {
            within_pairs(chains, 0, self.config.adjacency)
        };
        let mut results = Vec::with_capacity(candidates.len());
        self.visit(chains, candidates, self.config.cutoff, |r| {
            results.push(r);
            ControlFlow::Continue(())
        })?;
        Ok(results)
    }

    fn visit(
        &self,
        chains: &[PosedChain<'_>],
        candidates: Vec<Candidate>,
        cutoff: Option<f64>,
        mut f: impl FnMut(ProximityResult) -> ControlFlow<()>,
    ) -> Result<()> {
        let total = candidates.len();
        let mut culled = 0usize;

        for c in candidates {
            let (chain_a, poses_a) = chains[c.entry_a];
            let (chain_b, poses_b) = chains[c.entry_b];
            let (link_a, link_b) = (&chain_a.links()[c.link_a], &chain_b.links()[c.link_b]);
            let pose_a = poses_a.as_slice()[c.link_a];
            let pose_b = poses_b.as_slice()[c.link_b];

            if let Some(cutoff) = cutoff {
                let bound = pose_a.position.distance(pose_b.position)
                    - link_a.bounding_radius()
                    - link_b.bounding_radius();
                if bound > cutoff {
                    trace!("culled {} / {} (bound {:.4})", link_a.name, link_b.name, bound);
                    culled += 1;
                    continue;
                }
            }

            let Some(sep) = link_distance(link_a, pose_a, link_b, pose_b, &self.config.gjk)?
            else {
                continue;
            };
            let result = ProximityResult {
                link_a: link_ref(chain_a, c.link_a),
                link_b: link_ref(chain_b, c.link_b),
                distance: sep.distance,
                colliding: sep.colliding,
                point_a: sep.point_a,
                point_b: sep.point_b,
            };
            if f(result).is_break() {
                break;
            }
        }

        debug!("proximity: {} candidate pairs, {} culled", total, culled);
        Ok(())
    }
}

fn validate(chains: &[PosedChain<'_>]) -> Result<()> {
    chains
        .iter()
        .try_for_each(|(chain, poses)| poses.ensure_belongs_to(chain))
}

fn link_ref(chain: &KinematicChain, link: usize) -> LinkRef {
    LinkRef {
        chain: chain.id(),
        link,
        name: chain.links()[link].name.clone(),
    }
}

/// Minimum over every collider pair of the two links; `None` when either
/// link has no geometry.
fn link_distance(
    a: &Link,
    pose_a: Transform,
    b: &Link,
    pose_b: Transform,
    settings: &GjkSettings,
) -> Result<Option<Separation>> {
    let mut best: Option<Separation> = None;
    for ca in &a.collision {
        let world_a = pose_a * ca.origin;
        for cb in &b.collision {
            let world_b = pose_b * cb.origin;
            let sep = shape_distance(&world_a, &ca.shape, &world_b, &cb.shape, settings)?;
            if best.map_or(true, |prev| sep.distance < prev.distance) {
                best = Some(sep);
            }
        }
    }
    Ok(best)
}

fn within_pairs(
    chains: &[PosedChain<'_>],
    entry: usize,
    adjacency: AdjacencyPolicy,
) -> Vec<Candidate> {
    let chain = chains[entry].0;
    let links = chain.links();
    let mut pairs = Vec::new();
    for i in 0..links.len() {
        if !links[i].has_geometry() {
            continue;
        }
        for j in (i + 1)..links.len() {
            if !links[j].has_geometry() || chain.is_skipped(i, j) {
                continue;
            }
            if adjacency == AdjacencyPolicy::ExcludeAdjacent && chain.is_adjacent(i, j) {
                continue;
            }
            pairs.push(Candidate {
                entry_a: entry,
                link_a: i,
                entry_b: entry,
                link_b: j,
            });
        }
    }
    pairs
}

fn cross_pairs(chains: &[PosedChain<'_>], a: usize, b: usize) -> Vec<Candidate> {
    let links_a = chains[a].0.links();
    let links_b = chains[b].0.links();
    let mut pairs = Vec::new();
    for (i, la) in links_a.iter().enumerate() {
        if !la.has_geometry() {
            continue;
        }
        for (j, lb) in links_b.iter().enumerate() {
            if lb.has_geometry() {
                pairs.push(Candidate {
                    entry_a: a,
                    link_a: i,
                    entry_b: b,
                    link_b: j,
                });
            }
        }
    }
    pairs
}

fn all_pairs(chains: &[PosedChain<'_>], adjacency: AdjacencyPolicy) -> Vec<Candidate> {
    let mut pairs = Vec::new();
    for entry in 0..chains.len() {
        pairs.extend(within_pairs(chains, entry, adjacency));
    }
    for a in 0..chains.len() {
        for b in (a + 1)..chains.len() {
            pairs.extend(cross_pairs(chains, a, b));
        }
    }
    pairs
}
