//! Kinematic model
//!
//! Links, joints and the validated [`KinematicChain`] tree, plus the JSON and
//! URDF readers that build one from a file in the virtual filesystem.

mod chain;
mod description;
mod joint;
mod link;
mod loader;
mod urdf;

pub use chain::{ChainBuilder, ChainId, JointSpec, JointSpecKind, KinematicChain};
pub use description::{parse_json, ChainDescription};
pub use joint::{Joint, JointKind, JointLimits};
pub use link::{Collider, Link};
pub use loader::{ChainLoader, DescriptionFormat};
pub use urdf::parse_urdf;
