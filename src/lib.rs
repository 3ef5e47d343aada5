//! # kinprox
//!
//! Forward kinematics and proximity queries for articulated chains, built to
//! run inside a browser as WebAssembly as well as natively.
//!
//! ## Features
//! - In-memory virtual filesystem the host injects description files into
//! - Chain loading from JSON descriptions or a URDF subset
//! - Forward kinematics with configurable joint-limit handling
//! - Signed distance and collision between link geometries (closed forms, GJK, EPA)
//! - A flat-array bridge and `wasm-bindgen` exports for JavaScript hosts
//!
//! ## Example
//! ```rust,ignore
//! use kinprox::{Bridge, EngineConfig};
//!
//! let mut bridge = Bridge::new(EngineConfig::default());
//! bridge.inject_file("arm.json", std::fs::read("arm.json")?);
//! let arm = bridge.load_chain("arm.json")?;
//!
//! bridge.set_joint_state(arm, &["joint0"], &[std::f64::consts::FRAC_PI_2])?;
//! let poses = bridge.get_poses(arm)?; // 7 floats per link
//! let pairs = bridge.check_proximity(arm, None)?; // 6 floats per pair
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod kinematics;
pub mod math;
pub mod model;
pub mod proximity;
pub mod vfs;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bridge::{BoundaryError, Bridge, BridgeResult, ChainHandle, FlatCodec, ProximityRecord};
pub use config::EngineConfig;
pub use error::{Error, ErrorKind, Result};
pub use kinematics::{JointState, KinematicsConfig, KinematicsSolver, LimitPolicy, PoseSet};
pub use math::Transform;
pub use model::{ChainBuilder, ChainId, ChainLoader, JointSpec, KinematicChain, Link};
pub use proximity::{
    AdjacencyPolicy, ProximityConfig, ProximityEngine, ProximityResult, Separation, Shape,
};
pub use vfs::VirtualFs;
