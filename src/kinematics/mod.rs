//! Forward kinematics
//!
//! Resolves a [`JointState`] against a [`KinematicChain`](crate::model::KinematicChain)
//! into a [`PoseSet`] of world link poses.

mod poses;
mod solver;
mod state;

pub use poses::PoseSet;
pub use solver::{KinematicsConfig, KinematicsSolver, LimitPolicy};
pub use state::JointState;
