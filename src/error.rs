//! Error types shared by every layer of the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the VFS, the chain loader, the kinematics solver, the
/// proximity engine and the bridge.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No file stored under the given path.
    #[error("file not found: {path}")]
    NotFound {
        /// The normalized path that was looked up.
        path: String,
    },

    /// The chain description is malformed.
    #[error("parse error: {reason}")]
    Parse {
        /// What was wrong with the description.
        reason: String,
    },

    /// The joint graph is not a single rooted tree.
    #[error("structural error: {reason}")]
    Structural {
        /// Which tree property was violated.
        reason: String,
    },

    /// A joint axis has zero length or non-finite components.
    #[error("invalid axis on joint '{joint}'")]
    InvalidAxis {
        /// The joint carrying the axis.
        joint: String,
    },

    /// A non-fixed joint has no value in the joint state.
    #[error("missing value for joint '{joint}'")]
    MissingJoint {
        /// The joint without a value.
        joint: String,
    },

    /// A joint value lies outside its limits under the reject policy.
    #[error("value {value} out of limits for joint '{joint}'")]
    OutOfLimits {
        /// The limited joint.
        joint: String,
        /// The offending value.
        value: f64,
    },

    /// A shape (or shape pairing) has no distance routine.
    #[error("incompatible geometry: {reason}")]
    IncompatibleGeometry {
        /// Which shape was rejected and why.
        reason: String,
    },

    /// Malformed input at the host boundary.
    #[error("boundary validation failed: {reason}")]
    BoundaryValidation {
        /// What was wrong with the input.
        reason: String,
    },

    /// A pose set was used with a chain it was not resolved from.
    #[error("pose set does not belong to chain '{chain}'")]
    PoseMismatch {
        /// The chain the caller paired the poses with.
        chain: String,
    },

    /// Poses were requested before any joint state was applied.
    #[error("chain '{chain}' has no resolved poses; set a joint state first")]
    NotResolved {
        /// The unresolved chain.
        chain: String,
    },

    /// The host passed a handle that does not name a loaded chain.
    #[error("unknown chain handle {handle}")]
    UnknownHandle {
        /// The raw handle value.
        handle: u32,
    },
}

impl Error {
    /// Create a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Create a structural error.
    pub fn structural(reason: impl Into<String>) -> Self {
        Self::Structural {
            reason: reason.into(),
        }
    }

    /// Create an incompatible geometry error.
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleGeometry {
            reason: reason.into(),
        }
    }

    /// Create a boundary validation error.
    pub fn boundary(reason: impl Into<String>) -> Self {
        Self::BoundaryValidation {
            reason: reason.into(),
        }
    }

    /// The stable tag used when the error crosses the host boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Parse { .. } => ErrorKind::ParseError,
            Self::Structural { .. } => ErrorKind::StructuralError,
            Self::InvalidAxis { .. } => ErrorKind::InvalidAxis,
            Self::MissingJoint { .. } => ErrorKind::MissingJoint,
            Self::OutOfLimits { .. } => ErrorKind::OutOfLimits,
            Self::IncompatibleGeometry { .. } => ErrorKind::IncompatibleGeometry,
            Self::BoundaryValidation { .. } => ErrorKind::BoundaryValidation,
            Self::PoseMismatch { .. } => ErrorKind::PoseMismatch,
            Self::NotResolved { .. } => ErrorKind::NotResolved,
            Self::UnknownHandle { .. } => ErrorKind::UnknownHandle,
        }
    }
}

/// Flat error tag for the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    ParseError,
    StructuralError,
    InvalidAxis,
    MissingJoint,
    OutOfLimits,
    IncompatibleGeometry,
    BoundaryValidation,
    PoseMismatch,
    NotResolved,
    UnknownHandle,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::ParseError => "ParseError",
            Self::StructuralError => "StructuralError",
            Self::InvalidAxis => "InvalidAxis",
            Self::MissingJoint => "MissingJoint",
            Self::OutOfLimits => "OutOfLimits",
            Self::IncompatibleGeometry => "IncompatibleGeometry",
            Self::BoundaryValidation => "BoundaryValidation",
            Self::PoseMismatch => "PoseMismatch",
            Self::NotResolved => "NotResolved",
            Self::UnknownHandle => "UnknownHandle",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingJoint {
            joint: "elbow".into(),
        };
        assert!(err.to_string().contains("elbow"));

        let err = Error::parse("expected 3 values");
        assert!(err.to_string().contains("expected 3 values"));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(Error::structural("two roots").kind(), ErrorKind::StructuralError);
        assert_eq!(Error::boundary("len").kind().as_str(), "BoundaryValidation");
        assert_eq!(
            Error::OutOfLimits {
                joint: "j".into(),
                value: 4.0
            }
            .kind()
            .to_string(),
            "OutOfLimits"
        );
    }
}
