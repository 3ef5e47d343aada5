use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::DVec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::joint::{normalize_axis, Joint, JointKind, JointLimits};
use super::link::Link;
use crate::error::{Error, Result};
use crate::math::Transform;

static NEXT_CHAIN_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a loaded chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(u32);

impl ChainId {
    fn next() -> Self {
        Self(NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immutable, validated tree of links connected by joints.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    pub(crate) id: ChainId,
    pub(crate) name: String,
    pub(crate) base: Transform,
    pub(crate) links: Vec<Link>,
    pub(crate) joints: Vec<Joint>,
    pub(crate) root: usize,
    pub(crate) link_order: Vec<usize>,
    pub(crate) joint_order: Vec<usize>,
    pub(crate) dofs: Vec<usize>,
    pub(crate) adjacent: BTreeSet<(usize, usize)>,
    pub(crate) skipped: BTreeSet<(usize, usize)>,
}

impl KinematicChain {
    pub fn builder(name: impl Into<String>) -> ChainBuilder {
        ChainBuilder::new(name)
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// World pose of the root link.
    pub fn base(&self) -> Transform {
        self.base
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Link indices with every parent before its children.
    pub fn topological_order(&self) -> &[usize] {
        &self.link_order
    }

    /// Joint indices in the order their child links are resolved.
    pub fn joint_order(&self) -> &[usize] {
        &self.joint_order
    }

    /// Number of non-fixed joints.
    pub fn dof_count(&self) -> usize {
        self.dofs.len()
    }

    /// Non-fixed joints in DOF order.
    pub fn dof_joints(&self) -> impl Iterator<Item = &Joint> + '_ {
        self.dofs.iter().map(|&j| &self.joints[j])
    }

    pub fn link_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.links.iter().map(|l| l.name.as_str())
    }

    pub fn joint_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.joints.iter().map(|j| j.name.as_str())
    }

    pub fn dof_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.dof_joints().map(|j| j.name.as_str())
    }

    /// Parent link of `link`, `None` for the root.
    pub fn parent_link(&self, link: usize) -> Option<usize> {
        self.links
            .get(link)?
            .parent_joint
            .map(|j| self.joints[j].parent)
    }

    /// Whether a joint directly connects the two links.
    pub fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacent.contains(&ordered(a, b))
    }

    /// Whether the pair was excluded from proximity checks by the description.
    pub fn is_skipped(&self, a: usize, b: usize) -> bool {
        self.skipped.contains(&ordered(a, b))
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A joint as declared, before link names are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    pub name: String,
    pub kind: JointSpecKind,
    pub parent: String,
    pub child: String,
    pub origin: Transform,
    pub axis: DVec3,
    pub limits: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointSpecKind {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
}

impl JointSpec {
    pub fn new(
        name: impl Into<String>,
        kind: JointSpecKind,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: parent.into(),
            child: child.into(),
            origin: Transform::IDENTITY,
            axis: DVec3::X,
            limits: None,
        }
    }

    pub fn revolute(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        axis: DVec3,
    ) -> Self {
        Self::new(name, JointSpecKind::Revolute, parent, child).with_axis(axis)
    }

    pub fn prismatic(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        axis: DVec3,
    ) -> Self {
        Self::new(name, JointSpecKind::Prismatic, parent, child).with_axis(axis)
    }

    pub fn fixed(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self::new(name, JointSpecKind::Fixed, parent, child)
    }

    pub fn with_origin(mut self, origin: Transform) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_axis(mut self, axis: DVec3) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = Some((lower, upper));
        self
    }

    fn resolve_kind(&self) -> Result<JointKind> {
        let limits = || -> Result<Option<JointLimits>> {
            self.limits
                .map(|(lower, upper)| {
                    JointLimits::new(lower, upper).map_err(|e| match e {
                        Error::Parse { reason } => {
                            Error::parse(format!("joint '{}': {reason}", self.name))
                        }
                        other => other,
                    })
                })
                .transpose()
        };
        Ok(match self.kind {
            JointSpecKind::Revolute => JointKind::Revolute {
                axis: normalize_axis(&self.name, self.axis)?,
                limits: limits()?,
            },
            JointSpecKind::Continuous => {
                if self.limits.is_some() {
                    debug!("ignoring limits on continuous joint '{}'", self.name);
                }
                JointKind::Revolute {
                    axis: normalize_axis(&self.name, self.axis)?,
                    limits: None,
                }
            }
            JointSpecKind::Prismatic => JointKind::Prismatic {
                axis: normalize_axis(&self.name, self.axis)?,
                limits: limits()?,
            },
            JointSpecKind::Fixed => JointKind::Fixed,
        })
    }
}

/// Assembles and validates a [`KinematicChain`].
pub struct ChainBuilder {
    name: String,
    base: Transform,
    links: Vec<Link>,
    joints: Vec<JointSpec>,
    skip_pairs: Vec<(String, String)>,
}

impl ChainBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: Transform::IDENTITY,
            links: Vec::new(),
            joints: Vec::new(),
            skip_pairs: Vec::new(),
        }
    }

    pub fn base(mut self, base: Transform) -> Self {
        self.base = base;
        self
    }

    pub fn add_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn add_joint(mut self, joint: JointSpec) -> Self {
        self.joints.push(joint);
        self
    }

    /// Exclude a link pair from proximity checks.
    pub fn skip_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.skip_pairs.push((a.into(), b.into()));
        self
    }

    pub fn build(self) -> Result<KinematicChain> {
        let ChainBuilder {
            name,
            base,
            mut links,
            joints: specs,
            skip_pairs,
        } = self;

        if !base.is_finite() {
            return Err(Error::parse(format!("chain '{name}' has a non-finite base")));
        }

        let link_lookup = index_links(&links)?;
        check_link_geometry(&links)?;

        let mut joint_names = HashSet::new();
        let mut joints = Vec::with_capacity(specs.len());
        for spec in &specs {
            if !joint_names.insert(spec.name.as_str()) {
                return Err(Error::parse(format!("duplicate joint name '{}'", spec.name)));
            }
            let parent = lookup(&link_lookup, &spec.parent, &spec.name)?;
            let child = lookup(&link_lookup, &spec.child, &spec.name)?;
            if !spec.origin.is_finite() {
                return Err(Error::parse(format!(
                    "joint '{}' has a non-finite origin",
                    spec.name
                )));
            }
            joints.push(Joint {
                name: spec.name.clone(),
                kind: spec.resolve_kind()?,
                parent,
                child,
                origin: spec.origin,
            });
        }

        for (index, joint) in joints.iter().enumerate() {
            if joint.parent == joint.child {
                return Err(Error::structural(format!(
                    "joint '{}' connects link '{}' to itself",
                    joint.name, links[joint.child].name
                )));
            }
            let child = &mut links[joint.child];
            if let Some(previous) = child.parent_joint {
                return Err(Error::structural(format!(
                    "link '{}' has multiple parent joints ('{}' and '{}')",
                    child.name, joints[previous].name, joint.name
                )));
            }
            child.parent_joint = Some(index);
        }

        let root = find_root(&links)?;
        let link_order = topological_order(&links, &joints, root)?;
        let joint_order: Vec<usize> = link_order
            .iter()
            .filter_map(|&l| links[l].parent_joint)
            .collect();
        let dofs: Vec<usize> = joint_order
            .iter()
            .copied()
            .filter(|&j| !joints[j].is_fixed())
            .collect();
        let adjacent = joints
            .iter()
            .map(|j| ordered(j.parent, j.child))
            .collect();

        let mut skipped = BTreeSet::new();
        for (a, b) in &skip_pairs {
            let a = lookup(&link_lookup, a, "skip_pairs")?;
            let b = lookup(&link_lookup, b, "skip_pairs")?;
            skipped.insert(ordered(a, b));
        }

        let chain = KinematicChain {
            id: ChainId::next(),
            name,
            base,
            links,
            joints,
            root,
            link_order,
            joint_order,
            dofs,
            adjacent,
            skipped,
        };
        debug!(
            "built chain '{}' {}: {} links, {} joints, {} dofs",
            chain.name,
            chain.id,
            chain.links.len(),
            chain.joints.len(),
            chain.dofs.len()
        );
        Ok(chain)
    }
}

fn index_links(links: &[Link]) -> Result<HashMap<String, usize>> {
    let mut lookup = HashMap::with_capacity(links.len());
    for (index, link) in links.iter().enumerate() {
        if lookup.insert(link.name.clone(), index).is_some() {
            return Err(Error::parse(format!("duplicate link name '{}'", link.name)));
        }
    }
    Ok(lookup)
}

fn lookup(links: &HashMap<String, usize>, name: &str, referrer: &str) -> Result<usize> {
    links.get(name).copied().ok_or_else(|| {
        Error::parse(format!("'{referrer}' references unknown link '{name}'"))
    })
}

fn check_link_geometry(links: &[Link]) -> Result<()> {
    for link in links {
        if !link.offset.is_finite() {
            return Err(Error::parse(format!(
                "link '{}' has a non-finite offset",
                link.name
            )));
        }
        for collider in &link.collision {
            collider.shape.validate().map_err(|e| match e {
                Error::IncompatibleGeometry { reason } => {
                    Error::incompatible(format!("link '{}': {reason}", link.name))
                }
                other => other,
            })?;
            if !collider.origin.is_finite() {
                return Err(Error::parse(format!(
                    "link '{}' has a collider with a non-finite origin",
                    link.name
                )));
            }
        }
    }
    Ok(())
}

fn find_root(links: &[Link]) -> Result<usize> {
    let roots: Vec<usize> = links
        .iter()
        .enumerate()
        .filter(|(_, l)| l.parent_joint.is_none())
        .map(|(i, _)| i)
        .collect();
    match roots.as_slice() {
        [root] => Ok(*root),
        [] if links.is_empty() => Err(Error::structural("chain has no links")),
        [] => Err(Error::structural(
            "no root link: every link has a parent joint",
        )),
        many => {
            let names: Vec<&str> = many.iter().map(|&i| links[i].name.as_str()).collect();
            Err(Error::structural(format!(
                "multiple root links: {}",
                names.join(", ")
            )))
        }
    }
}

/// Breadth-first from the root, children in joint declaration order. Links
/// never reached sit on a cycle that is detached from the root.
fn topological_order(links: &[Link], joints: &[Joint], root: usize) -> Result<Vec<usize>> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); links.len()];
    for joint in joints {
        children[joint.parent].push(joint.child);
    }

    let mut order = Vec::with_capacity(links.len());
    let mut visited = vec![false; links.len()];
    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    while let Some(link) = queue.pop_front() {
        order.push(link);
        for &child in &children[link] {
            if !visited[child] {
                visited[child] = true;
                queue.push_back(child);
            }
        }
    }

    if let Some(stray) = visited.iter().position(|v| !v) {
        return Err(Error::structural(format!(
            "link '{}' is not reachable from root '{}' (kinematic loop)",
            links[stray].name, links[root].name
        )));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proximity::Shape;

    fn three_link() -> ChainBuilder {
        ChainBuilder::new("arm")
            .add_link(Link::new("base"))
            .add_link(Link::new("upper").with_shape(Shape::sphere(0.1)))
            .add_link(Link::new("lower"))
            .add_joint(JointSpec::revolute("shoulder", "base", "upper", DVec3::Z))
            .add_joint(
                JointSpec::prismatic("slide", "upper", "lower", DVec3::new(2.0, 0.0, 0.0))
                    .with_limits(0.0, 0.5),
            )
    }

    #[test]
    fn test_build_orders_and_dofs() {
        let chain = three_link().build().unwrap();
        assert_eq!(chain.root(), 0);
        assert_eq!(chain.topological_order(), &[0, 1, 2]);
        assert_eq!(chain.dof_count(), 2);
        assert_eq!(chain.dof_names().collect::<Vec<_>>(), ["shoulder", "slide"]);
        assert_eq!(chain.parent_link(2), Some(1));
        assert_eq!(chain.parent_link(0), None);
        assert!(chain.is_adjacent(1, 0));
        assert!(!chain.is_adjacent(0, 2));
        // Axes are normalized on load.
        assert_eq!(chain.joints()[1].kind.axis(), Some(DVec3::X));
    }

    #[test]
    fn test_declaration_order_does_not_matter() {
        let chain = ChainBuilder::new("shuffled")
            .add_link(Link::new("tip"))
            .add_link(Link::new("mid"))
            .add_link(Link::new("root"))
            .add_joint(JointSpec::fixed("b", "mid", "tip"))
            .add_joint(JointSpec::revolute("a", "root", "mid", DVec3::Y))
            .build()
            .unwrap();
        assert_eq!(chain.root(), 2);
        assert_eq!(chain.topological_order(), &[2, 1, 0]);
        assert_eq!(chain.joint_order(), &[1, 0]);
        assert_eq!(chain.dof_names().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_chain_ids_are_unique() {
        let a = three_link().build().unwrap();
        let b = three_link().build().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_unknown_link_is_parse_error() {
        let err = three_link()
            .add_joint(JointSpec::fixed("extra", "lower", "ghost"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }

    #[test]
    fn test_disconnected_link_is_structural() {
        let err = three_link()
            .add_link(Link::new("island"))
            .build()
            .unwrap_err();
        match err {
            Error::Structural { reason } => assert!(reason.contains("island")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_two_parents_is_structural() {
        let err = three_link()
            .add_joint(JointSpec::fixed("again", "base", "lower"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Structural { .. }));
    }

    #[test]
    fn test_detached_cycle_is_structural() {
        let err = three_link()
            .add_link(Link::new("x"))
            .add_link(Link::new("y"))
            .add_joint(JointSpec::fixed("xy", "x", "y"))
            .add_joint(JointSpec::fixed("yx", "y", "x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Structural { .. }));
    }

    #[test]
    fn test_empty_chain_is_structural() {
        assert!(matches!(
            ChainBuilder::new("empty").build(),
            Err(Error::Structural { .. })
        ));
    }

    #[test]
    fn test_duplicate_names() {
        let err = three_link().add_link(Link::new("base")).build().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        let err = three_link()
            .add_link(Link::new("x"))
            .add_joint(JointSpec::fixed("shoulder", "lower", "x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_zero_axis() {
        let err = ChainBuilder::new("bad")
            .add_link(Link::new("a"))
            .add_link(Link::new("b"))
            .add_joint(JointSpec::revolute("j", "a", "b", DVec3::ZERO))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidAxis { joint: "j".into() });
    }

    #[test]
    fn test_bad_limits_and_geometry() {
        let err = ChainBuilder::new("bad")
            .add_link(Link::new("a"))
            .add_link(Link::new("b"))
            .add_joint(JointSpec::revolute("j", "a", "b", DVec3::Z).with_limits(1.0, -1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = ChainBuilder::new("bad")
            .add_link(Link::new("a").with_shape(Shape::sphere(-1.0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleGeometry { .. }));
    }

    #[test]
    fn test_skip_pairs() {
        let chain = three_link().skip_pair("lower", "base").build().unwrap();
        assert!(chain.is_skipped(0, 2));
        assert!(chain.is_skipped(2, 0));
        assert!(!chain.is_skipped(0, 1));

        let err = three_link().skip_pair("base", "nope").build().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
