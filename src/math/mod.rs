//! Math utilities module
//!
//! Rigid transforms over glam's double-precision types.

mod transform;

pub use transform::Transform;

// Re-export commonly used glam types
pub use glam::{DQuat, DVec3, EulerRot};
