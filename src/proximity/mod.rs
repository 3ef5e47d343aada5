//! Proximity queries
//!
//! Signed distances between convex link geometries. Sphere and capsule pairs
//! use closed forms; everything else goes through GJK on support mappings,
//! with EPA for penetration depth.

mod engine;
mod epa;
mod gjk;
mod query;
mod shape;

pub use engine::{
    AdjacencyPolicy, LinkRef, PosedChain, ProximityConfig, ProximityEngine, ProximityResult,
};
pub use gjk::GjkSettings;
pub use query::{shape_distance, Separation};
pub use shape::{ConvexBody, Shape, ShapeKind, SupportMap};
